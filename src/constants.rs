pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;

pub const MIN_INGREDIENTS_AMOUNT: i32 = 1;
pub const MAX_INGREDIENTS_AMOUNT: i32 = 32_000;

pub const MAX_RECIPE_NAME_LEN: usize = 256;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_FIRST_NAME_LEN: usize = 150;
pub const MAX_LAST_NAME_LEN: usize = 150;
pub const MAX_PASSWORD_LEN: usize = 128;

pub const FORBIDDEN_USERNAMES: &[&str] = &["me"];
pub const USERNAME_EXTRA_CHARS: &[char] = &['.', '@', '+', '-', '_'];

pub const IMAGE_FORMATS: &[&str] = &["png", "jpg", "jpeg"];

/// Upper bound for JSON request bodies; recipe images travel inline as base64.
pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

pub const SHORT_LINK_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const SHOPPING_LIST_TITLE: &str = "Список покупок";
pub const SHOPPING_LIST_DATE: &str = "Дата";
pub const SHOPPING_LIST_DATE_FORMAT: &str = "%d-%m-%Y";
