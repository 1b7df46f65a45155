//! Place entity.

use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Place categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
    #[sea_orm(string_value = "cafe")]
    Cafe,
    #[sea_orm(string_value = "attraction")]
    Attraction,
    #[sea_orm(string_value = "accommodation")]
    Accommodation,
    #[sea_orm(string_value = "entertainment")]
    Entertainment,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "place")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(indexed)]
    pub category: PlaceCategory,

    #[sea_orm(nullable)]
    pub subcategory: Option<String>,

    #[sea_orm(nullable)]
    pub address_street: Option<String>,

    #[sea_orm(nullable)]
    pub address_city: Option<String>,

    /// Latitude in WGS84 degrees
    pub lat: f64,

    /// Longitude in WGS84 degrees
    pub lng: f64,

    pub min_price: f64,

    pub max_price: f64,

    /// Average review rating (0-5)
    pub rating_average: f64,

    /// Number of ratings (denormalized)
    #[sea_orm(default_value = 0)]
    pub rating_count: i32,

    pub wifi: bool,
    pub parking: bool,
    pub air_conditioning: bool,
    pub outdoor: bool,
    pub pet_friendly: bool,
    pub delivery: bool,
    pub takeaway: bool,
    pub card_payment: bool,

    /// Free-text tags
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    /// Soft-delete flag; inactive places are hidden from listings
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Owner user ID (no foreign key: owners may be removed independently)
    #[sea_orm(indexed)]
    pub created_by: String,

    /// Detail-page fetch counter
    #[sea_orm(default_value = 0)]
    pub view_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Tags as strings, skipping non-string JSON entries.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        tags_from_json(&self.tags)
    }
}

/// Extract string tags from a JSON array.
#[must_use]
pub fn tags_from_json(tags: &Json) -> Vec<String> {
    tags.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|t| t.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Owner,

    #[sea_orm(has_many = "super::review::Entity")]
    Review,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Boolean amenity flags a place can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceFeature {
    Wifi,
    Parking,
    AirConditioning,
    Outdoor,
    PetFriendly,
    Delivery,
    Takeaway,
    CardPayment,
}

impl PlaceFeature {
    /// All features, in display order.
    pub const ALL: [Self; 8] = [
        Self::Wifi,
        Self::Parking,
        Self::AirConditioning,
        Self::Outdoor,
        Self::PetFriendly,
        Self::Delivery,
        Self::Takeaway,
        Self::CardPayment,
    ];

    /// Name used in the HTTP API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::Parking => "parking",
            Self::AirConditioning => "airConditioning",
            Self::Outdoor => "outdoor",
            Self::PetFriendly => "petFriendly",
            Self::Delivery => "delivery",
            Self::Takeaway => "takeaway",
            Self::CardPayment => "cardPayment",
        }
    }

    /// Backing column.
    #[must_use]
    pub const fn column(self) -> Column {
        match self {
            Self::Wifi => Column::Wifi,
            Self::Parking => Column::Parking,
            Self::AirConditioning => Column::AirConditioning,
            Self::Outdoor => Column::Outdoor,
            Self::PetFriendly => Column::PetFriendly,
            Self::Delivery => Column::Delivery,
            Self::Takeaway => Column::Takeaway,
            Self::CardPayment => Column::CardPayment,
        }
    }
}

/// Error returned when parsing an unknown feature name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for PlaceFeature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}
