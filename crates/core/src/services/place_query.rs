//! Listing request to pipeline translation.

use sea_orm::Value;
use serde::Deserialize;
use validator::Validate;
use wayfind_common::config::ListingConfig;
use wayfind_common::{AppError, AppResult};
use wayfind_db::entities::place::{self, PlaceFeature};
use wayfind_db::geo::GeoPoint;
use wayfind_db::pipeline::{
    Filter, GeoNear, OwnerLookup, Pipeline, PipelineBuilder, SortKey, Stage,
};
use wayfind_db::repositories::LISTING_FIELDS;

/// Sort applied when the request names no usable sort field.
const DEFAULT_SORT: SortKey = SortKey::desc(place::Column::CreatedAt);

/// Query parameters of a place listing.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListPlacesQuery {
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    #[validate(range(min = 1))]
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Minimum average rating
    pub rating: Option<f64>,
    pub search: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    /// Search radius in kilometers
    #[validate(range(exclusive_min = 0.0))]
    pub radius: Option<f64>,
    /// Comma-separated fields, `-` prefix for descending
    pub sort: Option<String>,
    /// Comma-separated feature names that must all be set
    pub features: Option<String>,
}

/// Main and count pipelines for one listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQueryPlan {
    pub pipeline: Pipeline,
    pub count_pipeline: Pipeline,
    pub page: u64,
    pub limit: u64,
}

impl PlaceQueryPlan {
    /// Whether results are ordered by distance.
    #[must_use]
    pub fn is_geo(&self) -> bool {
        self.pipeline.geo_near().is_some()
    }
}

/// Builds listing pipelines from request parameters.
#[derive(Debug, Clone)]
pub struct PlaceQueryBuilder {
    listing: ListingConfig,
}

impl PlaceQueryBuilder {
    /// Create a builder with the given listing limits.
    #[must_use]
    pub const fn new(listing: ListingConfig) -> Self {
        Self { listing }
    }

    /// Translate a validated request into its pipelines.
    ///
    /// Geo search is used only when both coordinates are given; it then owns
    /// the active filter and the ordering, and any requested sort is ignored.
    pub fn build(&self, query: &ListPlacesQuery) -> AppResult<PlaceQueryPlan> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(self.listing.default_limit)
            .clamp(1, self.listing.max_limit.max(1));

        let mut builder = Pipeline::builder();

        let geo = match (query.lat, query.lng) {
            (Some(lat), Some(lng)) => Some(self.geo_near(lat, lng, query.radius)?),
            _ => None,
        };
        let is_geo = geo.is_some();
        if let Some(geo) = geo {
            push(&mut builder, Stage::GeoNear(geo))?;
        }

        let filters = filters(query, !is_geo)?;
        if !filters.is_empty() {
            push(&mut builder, Stage::Match(filters))?;
        }

        let count_pipeline = builder.snapshot().count_pipeline();

        if !is_geo {
            push(
                &mut builder,
                Stage::Sort(sort_keys(query.sort.as_deref().unwrap_or_default())),
            )?;
        }
        let skip = (page - 1).saturating_mul(limit);
        // Offsets are bound as signed 64-bit integers
        if i64::try_from(skip).is_err() {
            return Err(AppError::Validation(format!("page {page} is out of range")));
        }
        if skip > 0 {
            push(&mut builder, Stage::Skip(skip))?;
        }
        push(&mut builder, Stage::Limit(limit))?;
        push(
            &mut builder,
            Stage::LookupOwner(OwnerLookup {
                preserve_null: true,
            }),
        )?;
        push(&mut builder, Stage::Project(LISTING_FIELDS.to_vec()))?;

        Ok(PlaceQueryPlan {
            pipeline: builder.build(),
            count_pipeline,
            page,
            limit,
        })
    }

    fn geo_near(&self, lat: f64, lng: f64, radius_km: Option<f64>) -> AppResult<GeoNear> {
        let near = GeoPoint::new(lat, lng).map_err(|e| AppError::Validation(e.to_string()))?;
        let radius_km = radius_km.unwrap_or(self.listing.default_radius_km);
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AppError::Validation(
                "radius must be a positive number of kilometers".to_string(),
            ));
        }

        let max_distance_m = radius_km * 1000.0;
        if !max_distance_m.is_finite() {
            return Err(AppError::Validation(format!("radius {radius_km} is out of range")));
        }

        Ok(GeoNear {
            near,
            max_distance_m,
            only_active: true,
        })
    }
}

fn push(builder: &mut PipelineBuilder, stage: Stage) -> AppResult<()> {
    builder
        .push(stage)
        .map(|_| ())
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Match conditions in a fixed order.
fn filters(query: &ListPlacesQuery, include_active: bool) -> AppResult<Vec<Filter>> {
    let mut filters = Vec::new();

    if include_active {
        filters.push(Filter::Eq(place::Column::IsActive, true.into()));
    }
    if let Some(category) = non_empty(query.category.as_deref()) {
        filters.push(Filter::Eq(place::Column::Category, category.into()));
    }
    if let Some(subcategory) = non_empty(query.subcategory.as_deref()) {
        filters.push(Filter::Eq(place::Column::Subcategory, subcategory.into()));
    }
    if let Some(rating) = query.rating {
        filters.push(Filter::Gte(
            place::Column::RatingAverage,
            finite("rating", rating)?,
        ));
    }
    // Bounds apply to separate columns, not as a range overlap
    if let Some(min_price) = query.min_price {
        filters.push(Filter::Gte(
            place::Column::MinPrice,
            finite("minPrice", min_price)?,
        ));
    }
    if let Some(max_price) = query.max_price {
        filters.push(Filter::Lte(
            place::Column::MaxPrice,
            finite("maxPrice", max_price)?,
        ));
    }
    for feature in parse_features(query.features.as_deref().unwrap_or_default())? {
        filters.push(Filter::Eq(feature.column(), true.into()));
    }
    if let Some(term) = non_empty(query.search.as_deref()) {
        filters.push(Filter::Text(term.to_string()));
    }

    Ok(filters)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn finite(name: &str, value: f64) -> AppResult<Value> {
    if value.is_finite() {
        Ok(value.into())
    } else {
        Err(AppError::Validation(format!("{name} must be a finite number")))
    }
}

/// Parse a comma-separated feature list, ignoring blanks and repeats.
pub fn parse_features(list: &str) -> AppResult<Vec<PlaceFeature>> {
    let mut features = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let feature: PlaceFeature = name
            .parse()
            .map_err(|e: place::UnknownFeature| AppError::Validation(e.to_string()))?;
        if !features.contains(&feature) {
            features.push(feature);
        }
    }
    Ok(features)
}

/// Column behind an API sort field name.
fn sort_column(field: &str) -> Option<place::Column> {
    match field {
        "name" => Some(place::Column::Name),
        "createdAt" => Some(place::Column::CreatedAt),
        "viewCount" => Some(place::Column::ViewCount),
        "rating" | "rating.average" => Some(place::Column::RatingAverage),
        "rating.count" => Some(place::Column::RatingCount),
        "price" | "pricing.minPrice" => Some(place::Column::MinPrice),
        "pricing.maxPrice" => Some(place::Column::MaxPrice),
        _ => None,
    }
}

/// Parse a sort list such as `-rating,name`.
///
/// Unknown fields are skipped and only the first mention of a column counts.
/// The result always ends with an ascending ID so pages are stable.
#[must_use]
pub fn sort_keys(list: &str) -> Vec<SortKey> {
    let mut keys: Vec<SortKey> = Vec::new();
    for field in list.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let (descending, name) = match field.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, field),
        };
        let Some(column) = sort_column(name) else {
            continue;
        };
        if !keys.iter().any(|k| k.is_on(column)) {
            keys.push(SortKey { column, descending });
        }
    }

    if keys.is_empty() {
        keys.push(DEFAULT_SORT);
    }
    keys.push(SortKey::asc(place::Column::Id));
    keys
}
