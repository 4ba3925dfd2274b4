use std::{borrow::Cow, collections::BTreeSet};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::constants::{FORBIDDEN_USERNAMES, IMAGE_FORMATS, USERNAME_EXTRA_CHARS};

use super::{
    error::Error,
    form::{failure_message, parse_integer, FieldErrors, Form, REQUIRED},
    schema::Id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct IngredientAmount {
    #[validate(range(min = 1, message = "a valid ingredient id is required."))]
    pub id: i32, // `Id` alias spelled out: validator derive only recognises primitive number type names
    #[validate(range(min = 1, max = 32000, message = "amount must be between 1 and 32000."))]
    pub amount: i32,
}

/// A validated recipe payload. On update, `None` leaves the stored value unchanged.
#[derive(Debug, Default, Clone, PartialEq, Eq, Validate)]
pub struct RecipeDraft {
    #[validate(
        custom = "not_blank",
        length(max = 256, message = "Ensure this field has no more than 256 characters.")
    )]
    pub name: Option<String>,
    #[validate(custom = "not_blank")]
    pub text: Option<String>,
    #[validate(custom = "image_data")]
    pub image: Option<String>,
    #[validate(
        range(min = 1, message = "Ensure this value is greater than or equal to 1."),
        range(max = 32000, message = "Ensure this value is less than or equal to 32000.")
    )]
    pub cooking_time: Option<i32>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Id>>,
}

impl RecipeDraft {
    /// Reads the payload through `Form` so absent fields can be told apart
    /// from invalid ones, then applies the field rules.
    pub fn from_form(form: &Form, mode: WriteMode) -> Result<Self, Error> {
        let mut errors = FieldErrors::new();

        let draft = Self {
            name: required(&mut errors, "name", form.get_str("name"), mode),
            text: required(&mut errors, "text", form.get_str("text"), mode),
            image: required(&mut errors, "image", form.get_str("image"), mode),
            cooking_time: required(
                &mut errors,
                "cooking_time",
                form.get_number("cooking_time"),
                mode,
            )
            .map(saturate),
            ingredients: required(&mut errors, "ingredients", form.get_array("ingredients"), mode)
                .and_then(|values| parse_ingredients(&mut errors, values)),
            tags: required(&mut errors, "tags", form.get_array("tags"), mode)
                .and_then(|values| parse_tags(&mut errors, values)),
        };

        if let Err(invalid) = draft.validate() {
            errors.extend(&invalid);
        }
        errors.into_result(draft)
    }

    pub fn tag_set(&self) -> Option<BTreeSet<Id>> {
        self.tags.as_ref().map(|tags| tags.iter().copied().collect())
    }
}

fn required<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: Result<Option<T>, String>,
    mode: WriteMode,
) -> Option<T> {
    match value {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            if mode == WriteMode::Create {
                errors.add(field, REQUIRED);
            }
            None
        }
        Err(message) => {
            errors.add(field, &message);
            None
        }
    }
}

/// Out-of-range integers are clamped so the range rules report them.
fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));
    error
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", String::from("This field may not be blank.")));
    }
    Ok(())
}

/// `data:image/<png|jpg|jpeg>;base64,<payload>` with a decodable payload.
pub fn is_image_data(value: &str) -> bool {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return false;
    };
    let Some((format, payload)) = rest.split_once(";base64,") else {
        return false;
    };

    IMAGE_FORMATS.contains(&format.to_lowercase().as_str())
        && STANDARD
            .decode(payload)
            .is_ok_and(|bytes| !bytes.is_empty())
}

fn image_data(value: &str) -> Result<(), ValidationError> {
    if !is_image_data(value) {
        return Err(invalid(
            "image",
            format!(
                "Upload a valid image. Allowed formats are: {}.",
                IMAGE_FORMATS.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Letters, digits and `.@+-_`; reserved names such as `me` are refused.
fn username_chars(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    if FORBIDDEN_USERNAMES.contains(&value.to_lowercase().as_str()) {
        return Err(invalid(
            "username",
            format!("Username is not allowed: {value}"),
        ));
    }

    let forbidden: BTreeSet<char> = value
        .chars()
        .filter(|c| !(c.is_alphanumeric() || USERNAME_EXTRA_CHARS.contains(c)))
        .collect();
    if !forbidden.is_empty() {
        let chars: String = forbidden.into_iter().collect();
        return Err(invalid(
            "username",
            format!("Username contains forbidden characters: {chars}"),
        ));
    }
    Ok(())
}

fn parse_ingredients(errors: &mut FieldErrors, values: &[Value]) -> Option<Vec<IngredientAmount>> {
    if values.is_empty() {
        errors.add("ingredients", "This list may not be empty.");
        return None;
    }

    let mut ingredients = Vec::with_capacity(values.len());
    let mut valid = true;
    for (index, value) in values.iter().enumerate() {
        let position = index + 1;
        let Some(id) = value.get("id").and_then(parse_integer) else {
            errors.add("ingredients", &format!("Item {position}: a valid ingredient id is required."));
            valid = false;
            continue;
        };
        let Some(amount) = value.get("amount").and_then(parse_integer) else {
            errors.add("ingredients", &format!("Item {position}: a valid amount is required."));
            valid = false;
            continue;
        };

        let ingredient = IngredientAmount {
            id: saturate(id),
            amount: saturate(amount),
        };
        if let Err(invalid) = ingredient.validate() {
            for failure in invalid.field_errors().into_values().flatten() {
                errors.add(
                    "ingredients",
                    &format!("Item {position}: {}", failure_message(failure)),
                );
            }
            valid = false;
            continue;
        }

        ingredients.push(ingredient);
    }

    let unique: BTreeSet<Id> = ingredients.iter().map(|i| i.id).collect();
    if unique.len() != ingredients.len() {
        errors.add("ingredients", "Ingredients must be unique.");
        valid = false;
    }

    valid.then_some(ingredients)
}

fn parse_tags(errors: &mut FieldErrors, values: &[Value]) -> Option<Vec<Id>> {
    if values.is_empty() {
        errors.add("tags", "This list may not be empty.");
        return None;
    }

    let tags: Option<Vec<Id>> = values
        .iter()
        .map(|value| parse_integer(value).and_then(|id| Id::try_from(id).ok()))
        .collect();
    let Some(tags) = tags else {
        errors.add("tags", "Tags must be given as a list of ids.");
        return None;
    };

    let unique: BTreeSet<Id> = tags.iter().copied().collect();
    if unique.len() != tags.len() {
        errors.add("tags", "Tags must be unique.");
        return None;
    }
    Some(tags)
}

#[derive(Debug, Deserialize, Validate)]
struct Registration {
    #[validate(
        required(message = "This field is required."),
        length(max = 254, message = "Ensure this field has no more than 254 characters."),
        email(message = "Enter a valid email address.")
    )]
    email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom = "username_chars"
    )]
    username: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom = "not_blank"
    )]
    first_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom = "not_blank"
    )]
    last_name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 128, message = "Ensure this field has no more than 128 characters."),
        custom = "not_blank"
    )]
    password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl NewUser {
    pub fn from_form(form: &Form) -> Result<Self, Error> {
        let registration: Registration = form.validated()?;

        Ok(Self {
            email: registration.email.unwrap_or_default(),
            username: registration.username.unwrap_or_default(),
            first_name: registration.first_name.unwrap_or_default(),
            last_name: registration.last_name.unwrap_or_default(),
            password: registration.password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
struct PasswordPayload {
    #[validate(required(message = "This field is required."), custom = "not_blank")]
    current_password: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 128, message = "Ensure this field has no more than 128 characters."),
        custom = "not_blank"
    )]
    new_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn from_form(form: &Form) -> Result<Self, Error> {
        let payload: PasswordPayload = form.validated()?;

        Ok(Self {
            current_password: payload.current_password.unwrap_or_default(),
            new_password: payload.new_password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
struct AvatarPayload {
    #[validate(required(message = "This field is required."), custom = "image_data")]
    avatar: Option<String>,
}

pub fn avatar_from_form(form: &Form) -> Result<String, Error> {
    let payload: AvatarPayload = form.validated()?;
    Ok(payload.avatar.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::constants::{
        MAX_COOKING_TIME, MAX_EMAIL_LEN, MAX_FIRST_NAME_LEN, MAX_INGREDIENTS_AMOUNT,
        MAX_LAST_NAME_LEN, MAX_PASSWORD_LEN, MAX_RECIPE_NAME_LEN, MAX_USERNAME_LEN,
        MIN_COOKING_TIME, MIN_INGREDIENTS_AMOUNT,
    };

    use super::*;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    fn form(value: Value) -> Form {
        Form::from_value(value).unwrap()
    }

    fn recipe_payload() -> Value {
        json!({
            "ingredients": [{ "id": 1, "amount": 10 }, { "id": 2, "amount": "3" }],
            "tags": [1, 2],
            "image": IMAGE,
            "name": "Борщ",
            "text": "Варить долго.",
            "cooking_time": 90
        })
    }

    fn field_errors(result: Result<RecipeDraft, Error>) -> FieldErrors {
        result.unwrap_err().fields.unwrap()
    }

    fn registration() -> Value {
        json!({
            "email": "vasya@example.com",
            "username": "vasya.p+1@x",
            "first_name": "Вася",
            "last_name": "Пупкин",
            "password": "secret-password",
        })
    }

    #[test]
    fn accepts_complete_payload() {
        let draft = RecipeDraft::from_form(&form(recipe_payload()), WriteMode::Create).unwrap();
        assert_eq!(draft.name.as_deref(), Some("Борщ"));
        assert_eq!(draft.cooking_time, Some(90));
        assert_eq!(
            draft.ingredients,
            Some(vec![
                IngredientAmount { id: 1, amount: 10 },
                IngredientAmount { id: 2, amount: 3 },
            ])
        );
        assert_eq!(draft.tag_set(), Some(BTreeSet::from([1, 2])));
    }

    #[test]
    fn ingredient_order_follows_the_payload() {
        let mut payload = recipe_payload();
        payload["ingredients"] = json!([{ "id": 20, "amount": 1 }, { "id": 19, "amount": 2 }]);
        let draft = RecipeDraft::from_form(&form(payload), WriteMode::Create).unwrap();
        let ids: Vec<Id> = draft.ingredients.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![20, 19]);
    }

    #[test]
    fn create_requires_every_field() {
        let errors = field_errors(RecipeDraft::from_form(&form(json!({})), WriteMode::Create));
        for field in ["ingredients", "tags", "image", "name", "text", "cooking_time"] {
            assert_eq!(errors.get(field), Some(&[String::from(REQUIRED)][..]), "{field}");
        }
    }

    #[test]
    fn update_leaves_absent_fields_alone() {
        let draft =
            RecipeDraft::from_form(&form(json!({ "name": "Щи" })), WriteMode::Update).unwrap();
        assert_eq!(draft.name.as_deref(), Some("Щи"));
        assert!(draft.ingredients.is_none());
        assert!(draft.tags.is_none());
        assert!(draft.image.is_none());
    }

    #[test]
    fn update_still_checks_present_fields() {
        let errors = field_errors(RecipeDraft::from_form(
            &form(json!({ "name": "  ", "cooking_time": 0 })),
            WriteMode::Update,
        ));
        assert_eq!(
            errors.get("name"),
            Some(&[String::from("This field may not be blank.")][..])
        );
        assert_eq!(
            errors.get("cooking_time"),
            Some(&[String::from("Ensure this value is greater than or equal to 1.")][..])
        );
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let mut payload = recipe_payload();
        payload["ingredients"] = json!([{ "id": 1, "amount": 1 }, { "id": 1, "amount": 2 }]);
        let errors = field_errors(RecipeDraft::from_form(&form(payload), WriteMode::Create));
        assert_eq!(
            errors.get("ingredients"),
            Some(&[String::from("Ingredients must be unique.")][..])
        );
    }

    #[test]
    fn empty_lists_are_rejected_even_on_update() {
        let errors = field_errors(RecipeDraft::from_form(
            &form(json!({ "ingredients": [], "tags": [] })),
            WriteMode::Update,
        ));
        assert!(errors.get("ingredients").is_some());
        assert!(errors.get("tags").is_some());
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let mut payload = recipe_payload();
        payload["tags"] = json!([3, 3]);
        let errors = field_errors(RecipeDraft::from_form(&form(payload), WriteMode::Create));
        assert_eq!(errors.get("tags"), Some(&[String::from("Tags must be unique.")][..]));
    }

    #[test]
    fn bounds_are_enforced() {
        let mut payload = recipe_payload();
        payload["cooking_time"] = json!(MAX_COOKING_TIME + 1);
        payload["ingredients"] = json!([{ "id": 1, "amount": MAX_INGREDIENTS_AMOUNT + 1 }]);
        let errors = field_errors(RecipeDraft::from_form(&form(payload), WriteMode::Create));
        assert_eq!(
            errors.get("cooking_time"),
            Some(&[String::from("Ensure this value is less than or equal to 32000.")][..])
        );
        assert_eq!(
            errors.get("ingredients"),
            Some(&[String::from("Item 1: amount must be between 1 and 32000.")][..])
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut payload = recipe_payload();
        payload["cooking_time"] = json!(MIN_COOKING_TIME);
        payload["name"] = json!("щ".repeat(MAX_RECIPE_NAME_LEN));
        payload["ingredients"] = json!([
            { "id": 1, "amount": MIN_INGREDIENTS_AMOUNT },
            { "id": 2, "amount": MAX_INGREDIENTS_AMOUNT },
        ]);
        assert!(RecipeDraft::from_form(&form(payload.clone()), WriteMode::Create).is_ok());

        payload["cooking_time"] = json!(MAX_COOKING_TIME);
        payload["name"] = json!("щ".repeat(MAX_RECIPE_NAME_LEN + 1));
        let errors = field_errors(RecipeDraft::from_form(&form(payload), WriteMode::Create));
        assert!(errors.get("cooking_time").is_none());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn huge_numbers_are_out_of_range() {
        let mut payload = recipe_payload();
        payload["cooking_time"] = json!(i64::MAX);
        let errors = field_errors(RecipeDraft::from_form(&form(payload), WriteMode::Create));
        assert!(errors.get("cooking_time").is_some());
    }

    #[test]
    fn image_must_be_a_data_uri() {
        assert!(is_image_data(IMAGE));
        assert!(is_image_data("data:image/JPEG;base64,AAAA"));
        assert!(!is_image_data("data:image/gif;base64,AAAA"));
        assert!(!is_image_data("http://example.com/a.png"));
        assert!(!is_image_data("data:image/png;base64,"));
    }

    #[test]
    fn image_payload_must_decode() {
        assert!(!is_image_data("data:image/png;base64,A"));
        assert!(!is_image_data("data:image/png;base64,AAAAA"));
        assert!(!is_image_data("data:image/png;base64,AA=A"));
    }

    #[test]
    fn usernames_are_checked() {
        assert!(username_chars("me").is_err());
        assert!(username_chars("bad name!").is_err());
        assert!(username_chars("   ").is_err());
        assert!(username_chars("vasya.p+1@x").is_ok());
    }

    #[test]
    fn registration_reads_every_field() {
        let user = NewUser::from_form(&form(registration())).unwrap();
        assert_eq!(user.username, "vasya.p+1@x");
        assert_eq!(user.last_name, "Пупкин");
    }

    #[test]
    fn registration_collects_all_errors() {
        let error = NewUser::from_form(&form(json!({
            "email": "not-an-email",
            "username": "me",
            "first_name": "",
        })))
        .unwrap_err();
        let fields = error.fields.unwrap();
        assert_eq!(
            fields.get("email"),
            Some(&[String::from("Enter a valid email address.")][..])
        );
        assert_eq!(
            fields.get("username"),
            Some(&[String::from("Username is not allowed: me")][..])
        );
        assert_eq!(
            fields.get("first_name"),
            Some(&[String::from("This field may not be blank.")][..])
        );
        for field in ["last_name", "password"] {
            assert_eq!(fields.get(field), Some(&[String::from(REQUIRED)][..]), "{field}");
        }
    }

    #[test]
    fn registration_limits_lengths() {
        let mut payload = registration();
        payload["email"] = json!(format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN)));
        payload["username"] = json!("u".repeat(MAX_USERNAME_LEN + 1));
        payload["first_name"] = json!("и".repeat(MAX_FIRST_NAME_LEN + 1));
        payload["last_name"] = json!("ф".repeat(MAX_LAST_NAME_LEN + 1));
        payload["password"] = json!("p".repeat(MAX_PASSWORD_LEN + 1));
        let fields = NewUser::from_form(&form(payload)).unwrap_err().fields.unwrap();
        for field in ["email", "username", "first_name", "last_name", "password"] {
            assert!(fields.get(field).is_some(), "{field}");
        }

        let mut payload = registration();
        payload["first_name"] = json!("и".repeat(MAX_FIRST_NAME_LEN));
        payload["last_name"] = json!("ф".repeat(MAX_LAST_NAME_LEN));
        payload["password"] = json!("p".repeat(MAX_PASSWORD_LEN));
        assert!(NewUser::from_form(&form(payload)).is_ok());
    }

    #[test]
    fn wrong_types_are_reported() {
        let mut payload = registration();
        payload["email"] = json!(5);
        let fields = NewUser::from_form(&form(payload)).unwrap_err().fields.unwrap();
        assert!(fields.get("non_field_errors").is_some());
    }

    #[test]
    fn password_change_requires_both_fields() {
        let fields = PasswordChange::from_form(&form(json!({ "current_password": "old" })))
            .unwrap_err()
            .fields
            .unwrap();
        assert!(fields.get("current_password").is_none());
        assert_eq!(fields.get("new_password"), Some(&[String::from(REQUIRED)][..]));
    }

    #[test]
    fn avatar_requires_image() {
        assert_eq!(avatar_from_form(&form(json!({ "avatar": IMAGE }))).unwrap(), IMAGE);
        assert!(avatar_from_form(&form(json!({}))).is_err());
        assert!(avatar_from_form(&form(json!({ "avatar": "data:image/png;base64,A" }))).is_err());
    }
}
