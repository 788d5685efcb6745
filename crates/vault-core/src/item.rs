//! Item data model.
//!
//! An `Item` carries its non-secret overview fields plus an optional,
//! lazily-fetched `ItemContent` holding the secrets. The `Overview` is the
//! projection that lives in the encrypted index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known values for `Item::type_name`.
pub mod types {
    pub const LOGIN: &str = "login";
    pub const PASSWORD: &str = "password";
    pub const SECURE_NOTE: &str = "secure_note";
    pub const CREDIT_CARD: &str = "credit_card";
    pub const IDENTITY: &str = "identity";
}

/// When the item may be offered for autofill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutofillScope {
    #[default]
    Always,
    Prompt,
    Never,
}

/// Non-secret fields that stay visible while the vault is locked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenContents {
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub scope: AutofillScope,
}

/// Summary of an item, stored in the overview index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub uuid: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub trashed: bool,
    pub type_name: String,
    #[serde(default)]
    pub open_contents: OpenContents,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub account: Option<String>,
}

/// Presentation hint for a content field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Password,
    Email,
    Url,
    Totp,
}

/// Role a field plays when filling a login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDesignation {
    Username,
    Password,
}

/// A named value inside an item's secret content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<FieldDesignation>,
}

impl ItemField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            designation: None,
        }
    }

    pub fn designated(mut self, designation: FieldDesignation) -> Self {
        self.designation = Some(designation);
        self
    }
}

/// A password that was replaced, kept so it can be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHistoryEntry {
    pub value: String,
    pub replaced_at: DateTime<Utc>,
}

/// Secret payload of an item, encrypted separately from the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContent {
    #[serde(default)]
    pub fields: Vec<ItemField>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub password_history: Vec<PasswordHistoryEntry>,
}

impl ItemContent {
    pub fn field(&self, name: &str) -> Option<&ItemField> {
        self.fields.iter().find(|field| field.name == name)
    }

    fn designated(&self, designation: FieldDesignation) -> Option<&ItemField> {
        self.fields
            .iter()
            .find(|field| field.designation == Some(designation))
    }

    pub fn username(&self) -> Option<&str> {
        self.designated(FieldDesignation::Username)
            .map(|field| field.value.as_str())
    }

    pub fn password(&self) -> Option<&str> {
        self.designated(FieldDesignation::Password)
            .map(|field| field.value.as_str())
    }

    /// Replace the designated password, moving the old value to history.
    pub fn set_password(&mut self, value: impl Into<String>) {
        let value = value.into();
        let existing = self
            .fields
            .iter_mut()
            .find(|field| field.designation == Some(FieldDesignation::Password));

        match existing {
            Some(field) => {
                if field.value == value {
                    return;
                }
                let previous = std::mem::replace(&mut field.value, value);
                self.password_history.push(PasswordHistoryEntry {
                    value: previous,
                    replaced_at: Utc::now(),
                });
            }
            None => self.fields.push(
                ItemField::new("password", value, FieldKind::Password)
                    .designated(FieldDesignation::Password),
            ),
        }
    }
}

/// A stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub uuid: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub trashed: bool,
    pub type_name: String,
    pub open_contents: OpenContents,
    pub locations: Vec<String>,
    pub account: Option<String>,
    /// `None` until fetched from the store or assigned by the caller.
    pub content: Option<ItemContent>,
}

impl Item {
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            trashed: false,
            type_name: type_name.into(),
            open_contents: OpenContents::default(),
            locations: Vec::new(),
            account: None,
            content: None,
        }
    }

    pub fn with_content(mut self, content: ItemContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn overview(&self) -> Overview {
        Overview {
            uuid: self.uuid,
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            trashed: self.trashed,
            type_name: self.type_name.clone(),
            open_contents: self.open_contents.clone(),
            locations: self.locations.clone(),
            account: self.account.clone(),
        }
    }

    pub fn is_content_loaded(&self) -> bool {
        self.content.is_some()
    }
}

impl From<Overview> for Item {
    fn from(overview: Overview) -> Self {
        Self {
            uuid: overview.uuid,
            title: overview.title,
            created_at: overview.created_at,
            updated_at: overview.updated_at,
            trashed: overview.trashed,
            type_name: overview.type_name,
            open_contents: overview.open_contents,
            locations: overview.locations,
            account: overview.account,
            content: None,
        }
    }
}
