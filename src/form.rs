//! Form definitions and public endpoint slugs
//!
//! A form belongs to a project and is an ordered list of typed elements
//! (see [`crate::element`]). Each form is reachable at `POST /submit/{endpoint}`
//! where `endpoint` is a URL-safe slug derived from the title.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::FormElement;

/// A form definition stored in the database.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    /// Unique identifier for the form
    pub id: String,

    /// The project this form belongs to
    pub project_id: String,

    /// Human-readable title, source of the endpoint slug
    pub title: String,

    /// Optional machine name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered element list; replaced wholesale on every save
    #[serde(default)]
    pub elements: Vec<FormElement>,

    /// URL path segment for the public submission endpoint.
    /// Unique across all forms and regenerated whenever `title` changes.
    pub endpoint: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    pub fn new(
        project_id: String,
        title: String,
        name: Option<String>,
        description: Option<String>,
        elements: Vec<FormElement>,
    ) -> Self {
        let now = Utc::now();
        let endpoint = endpoint_slug(&title);
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            title,
            name,
            description,
            elements,
            endpoint,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derives the public endpoint slug from a form title.
///
/// Lowercases the title, collapses every run of characters outside `[a-z0-9]`
/// into a single hyphen and strips leading/trailing hyphens. Deterministic and
/// idempotent; callers re-run it only when the title changes.
pub fn endpoint_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    // Starts true so a leading separator run never emits a hyphen
    let mut pending_separator = true;
    for c in title.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            pending_separator = false;
        } else if !pending_separator {
            slug.push('-');
            pending_separator = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(endpoint_slug("Contact Us"), "contact-us");
        assert_eq!(endpoint_slug("My Form 2"), "my-form-2");
    }

    #[test]
    fn slug_collapses_symbol_runs() {
        assert_eq!(endpoint_slug("Hello --- World!!!"), "hello-world");
        assert_eq!(endpoint_slug("a  /  b"), "a-b");
    }

    #[test]
    fn slug_strips_leading_and_trailing_hyphens() {
        assert_eq!(endpoint_slug("  Contact Us!  "), "contact-us");
        assert_eq!(endpoint_slug("---x---"), "x");
    }

    #[test]
    fn slug_is_idempotent() {
        let once = endpoint_slug("Customer Feedback (2024)");
        assert_eq!(endpoint_slug(&once), once);
    }

    #[test]
    fn slug_drops_non_ascii() {
        assert_eq!(endpoint_slug("Café Menu"), "caf-menu");
    }

    #[test]
    fn slug_of_symbols_only_is_empty() {
        assert_eq!(endpoint_slug("!!!"), "");
    }

    #[test]
    fn new_form_derives_endpoint_from_title() {
        let form = Form::new(
            "p1".to_string(),
            "Contact Us!".to_string(),
            None,
            None,
            vec![],
        );
        assert_eq!(form.endpoint, "contact-us");
    }
}
