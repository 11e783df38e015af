//! Tour and transfer categories.
//!
//! Both kinds share the same shape and request bodies but live under
//! separate endpoints, so each gets its own type.

use serde::{Deserialize, Serialize};

use crate::store::{InsertPosition, Resource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TourCategory {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TransferCategory {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CategoryInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for TourCategory {
    type Create = CategoryInput;
    type Patch = CategoryPatch;

    const NAME: &'static str = "tour categories";
    const PATH: &'static str = "tour-categories";
    const INSERT_AT: InsertPosition = InsertPosition::Back;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Resource for TransferCategory {
    type Create = CategoryInput;
    type Patch = CategoryPatch;

    const NAME: &'static str = "transfer categories";
    const PATH: &'static str = "transfer-categories";
    const INSERT_AT: InsertPosition = InsertPosition::Back;

    fn id(&self) -> &str {
        &self.id
    }
}
