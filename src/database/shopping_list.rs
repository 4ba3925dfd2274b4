use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::constants::{SHOPPING_LIST_DATE, SHOPPING_LIST_DATE_FORMAT, SHOPPING_LIST_TITLE};

use super::search::name_order;

/// One ingredient association of a recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Groups lines by (name, measurement unit) and sums their amounts.
/// Output is ordered by ingredient name.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();
    lines.into_iter().for_each(|line| {
        *groups
            .entry((line.name, line.measurement_unit))
            .or_insert(0) += i64::from(line.amount);
    });

    let mut items: Vec<ShoppingListItem> = groups
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            measurement_unit,
            total_amount,
        })
        .collect();
    items.sort_by(|a, b| {
        name_order(&a.name, &b.name).then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });
    items
}

#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub username: String,
    pub date: NaiveDate,
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn new<I>(username: &str, date: NaiveDate, lines: I) -> Self
    where
        I: IntoIterator<Item = CartLine>,
    {
        Self {
            username: username.to_string(),
            date,
            items: aggregate(lines),
        }
    }

    pub fn file_name(&self) -> String {
        format!("shopping_cart_{}.txt", self.username)
    }

    pub fn render(&self) -> String {
        let header = format!(
            "{SHOPPING_LIST_TITLE} {}\n{SHOPPING_LIST_DATE}: {}",
            self.username,
            self.date.format(SHOPPING_LIST_DATE_FORMAT)
        );
        let body = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "{} {} {}",
                    item.name, item.total_amount, item.measurement_unit
                )
            })
            .collect::<Vec<String>>()
            .join("\n");

        format!("{header}\n\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn sums_amounts_across_recipes() {
        // recipe1 {A:2, B:1} + recipe2 {A:3}
        let lines = vec![line("B", "g", 1), line("A", "g", 2), line("A", "g", 3)];
        let items = aggregate(lines);

        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: String::from("A"),
                    measurement_unit: String::from("g"),
                    total_amount: 5,
                },
                ShoppingListItem {
                    name: String::from("B"),
                    measurement_unit: String::from("g"),
                    total_amount: 1,
                },
            ]
        );
    }

    #[test]
    fn same_name_with_other_unit_is_a_separate_group() {
        let items = aggregate(vec![line("соль", "г", 5), line("соль", "ч. л.", 1)]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn renders_report_with_header_and_date() {
        let list = ShoppingList::new(
            "alice",
            date(),
            vec![line("Сахар", "г", 100), line("Мука", "г", 200), line("Сахар", "г", 50)],
        );

        assert_eq!(
            list.render(),
            "Список покупок alice\nДата: 07-03-2024\n\nМука 200 г\nСахар 150 г"
        );
        assert_eq!(list.file_name(), "shopping_cart_alice.txt");
    }

    #[test]
    fn empty_cart_renders_header_only() {
        let list = ShoppingList::new("bob", date(), Vec::new());
        assert!(list.items.is_empty());
        assert_eq!(list.render(), "Список покупок bob\nДата: 07-03-2024\n\n");
    }

    #[test]
    fn totals_do_not_overflow_small_amounts() {
        let lines = (0..100).map(|_| line("вода", "мл", i32::MAX));
        let items = aggregate(lines);
        assert_eq!(items[0].total_amount, 100 * i64::from(i32::MAX));
    }

    #[test]
    fn items_are_ordered_alphabetically_regardless_of_case() {
        let items = aggregate(vec![
            line("Яйца", "шт", 2),
            line("ёрш", "шт", 1),
            line("молоко", "мл", 200),
            line("Мука", "г", 300),
        ]);
        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["ёрш", "молоко", "Мука", "Яйца"]);
    }
}
