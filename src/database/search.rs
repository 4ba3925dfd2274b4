use std::cmp::Ordering;

use super::schema::Ingredient;

/// Case-insensitive substring match.
pub fn matches(name: &str, term: &str) -> bool {
    name.to_lowercase().contains(&term.to_lowercase())
}

fn starts_with(name: &str, term: &str) -> bool {
    name.to_lowercase().starts_with(&term.to_lowercase())
}

fn sort_key(name: &str) -> String {
    name.to_lowercase().replace('ё', "е")
}

/// Alphabetical order for display: case-insensitive, `ё` sorted with `е`.
pub fn name_order(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

/// Keeps ingredients whose name contains `term` and orders prefix matches
/// first, then alphabetically. A blank term keeps everything in name order.
pub fn rank_ingredients(term: &str, mut ingredients: Vec<Ingredient>) -> Vec<Ingredient> {
    let term = term.trim();
    if term.is_empty() {
        ingredients.sort_by(|a, b| name_order(&a.name, &b.name));
        return ingredients;
    }

    ingredients.retain(|ingredient| matches(&ingredient.name, term));
    ingredients.sort_by(|a, b| {
        match (starts_with(&a.name, term), starts_with(&b.name, term)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => name_order(&a.name, &b.name),
        }
    });
    ingredients
}
