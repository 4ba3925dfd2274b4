use super::{
    error::Error,
    form::FieldErrors,
    pagination::PageQuery,
    schema::Id,
};

/// Query parameters accepted by the recipe listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: PageQuery,
}

impl RecipeFilter {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, Error> {
        let mut filter = Self::default();
        let mut errors = FieldErrors::new();

        for (key, value) in pairs {
            match key.as_str() {
                "tags" => {
                    if !value.is_empty() && !filter.tags.contains(&value) {
                        filter.tags.push(value);
                    }
                }
                "author" => match value.parse() {
                    Ok(author) => filter.author = Some(author),
                    Err(_) => errors.add("author", "Enter a number."),
                },
                "is_favorited" => match parse_flag(&value) {
                    Some(flag) => filter.is_favorited = flag,
                    None => errors.add("is_favorited", "Enter a number."),
                },
                "is_in_shopping_cart" => match parse_flag(&value) {
                    Some(flag) => filter.is_in_shopping_cart = flag,
                    None => errors.add("is_in_shopping_cart", "Enter a number."),
                },
                "page" => match value.parse() {
                    Ok(page) => filter.page.page = Some(page),
                    Err(_) => errors.add("page", "Enter a number."),
                },
                "limit" => match value.parse() {
                    Ok(limit) => filter.page.limit = Some(limit),
                    Err(_) => errors.add("limit", "Enter a number."),
                },
                _ => {}
            }
        }

        errors.into_result(filter)
    }

    /// The user whose favorites restrict the listing. Anonymous viewers
    /// have the flag ignored rather than rejected.
    pub fn favorited_by(&self, viewer: Option<Id>) -> Option<Id> {
        viewer.filter(|_| self.is_favorited)
    }

    pub fn in_cart_of(&self, viewer: Option<Id>) -> Option<Id> {
        viewer.filter(|_| self.is_in_shopping_cart)
    }
}

/// Numeric flags: any non-zero number is true. `true`/`false` are accepted too.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" => Some(true),
        "false" | "False" => Some(false),
        v => v.parse::<i64>().ok().map(|n| n != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn collects_repeated_tags() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("tags", "breakfast"),
            ("author", "3"),
            ("limit", "2"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "dinner"]);
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.page.limit(), 2);
    }

    #[test]
    fn anonymous_viewers_ignore_relation_flags() {
        let filter =
            RecipeFilter::from_pairs(pairs(&[("is_favorited", "1"), ("is_in_shopping_cart", "1")]))
                .unwrap();

        assert_eq!(filter.favorited_by(None), None);
        assert_eq!(filter.in_cart_of(None), None);
        assert_eq!(filter.favorited_by(Some(7)), Some(7));
        assert_eq!(filter.in_cart_of(Some(7)), Some(7));
    }

    #[test]
    fn zero_flag_disables_filter() {
        let filter = RecipeFilter::from_pairs(pairs(&[("is_favorited", "0")])).unwrap();
        assert_eq!(filter.favorited_by(Some(7)), None);
    }

    #[test]
    fn malformed_numbers_are_field_errors() {
        let error = RecipeFilter::from_pairs(pairs(&[("author", "bob"), ("is_favorited", "yes")]))
            .unwrap_err();
        let fields = error.fields.unwrap();
        assert!(fields.get("author").is_some());
        assert!(fields.get("is_favorited").is_some());
    }
}
