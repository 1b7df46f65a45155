//! Typed aggregation pipeline over places.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s validated as it is built,
//! then compiled into a single `PostgreSQL` statement. Stage ordering follows
//! document-database aggregation semantics: an optional proximity stage first,
//! then filters, sort, pagination, the owner join, and the projection. A count
//! pipeline shares the filter prefix and ends in [`Stage::Count`].

use sea_orm::{
    DbBackend, IdenStatic, Statement, Value,
    sea_query::{
        Alias, Asterisk, Expr, JoinType, Order, Query, SelectStatement, SimpleExpr,
    },
};
use thiserror::Error;

use crate::entities::{place, user};
use crate::geo::{EARTH_RADIUS_M, GeoPoint};

/// Text search document; must match `idx_place_text_search`.
const TEXT_SEARCH_DOCUMENT: &str = r#"to_tsvector('simple', COALESCE("place"."name", '') || ' ' || COALESCE("place"."description", '') || ' ' || COALESCE("place"."tags"::text, ''))"#;

/// Pipeline construction error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A proximity stage was added after other stages.
    #[error("geoNear must be the first stage of a pipeline")]
    GeoNearNotFirst,
    /// A sort was added to a proximity pipeline.
    #[error("sort cannot be combined with geoNear; results are ordered by distance")]
    SortWithGeoNear,
    /// A stage was added after a stage it must precede.
    #[error("{stage} stage cannot follow {previous}")]
    OutOfOrder {
        /// Stage being added.
        stage: &'static str,
        /// Stage already in the pipeline.
        previous: &'static str,
    },
    /// A stage that may appear once was added twice.
    #[error("duplicate {0} stage")]
    Duplicate(&'static str),
    /// Limit of zero.
    #[error("limit must be positive")]
    ZeroLimit,
    /// Non-positive or non-finite proximity distance.
    #[error("max distance must be a positive number of meters")]
    InvalidDistance,
}

/// Proximity stage parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    /// Reference point.
    pub near: GeoPoint,
    /// Maximum great-circle distance in meters.
    pub max_distance_m: f64,
    /// Restrict the stage to active places.
    pub only_active: bool,
}

/// Columns compare by SQL name.
fn same_column(a: place::Column, b: place::Column) -> bool {
    IdenStatic::as_str(&a) == IdenStatic::as_str(&b)
}

/// A single filter condition on a place column.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Column equals value.
    Eq(place::Column, Value),
    /// Column is greater than or equal to value.
    Gte(place::Column, Value),
    /// Column is less than or equal to value.
    Lte(place::Column, Value),
    /// Full-text match against name, description and tags.
    Text(String),
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Eq(a, x), Self::Eq(b, y))
            | (Self::Gte(a, x), Self::Gte(b, y))
            | (Self::Lte(a, x), Self::Lte(b, y)) => same_column(*a, *b) && x == y,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Filter {
    fn to_expr(&self) -> SimpleExpr {
        match self {
            Self::Eq(column, value) => Expr::col((place::Entity, *column)).eq(value.clone()),
            Self::Gte(column, value) => Expr::col((place::Entity, *column)).gte(value.clone()),
            Self::Lte(column, value) => Expr::col((place::Entity, *column)).lte(value.clone()),
            Self::Text(term) => Expr::cust_with_values(
                format!("{TEXT_SEARCH_DOCUMENT} @@ plainto_tsquery('simple', $1)"),
                [term.clone()],
            ),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    /// Column to order by.
    pub column: place::Column,
    /// Descending when true.
    pub descending: bool,
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.descending == other.descending && self.is_on(other.column)
    }
}

impl Eq for SortKey {}

impl SortKey {
    /// Whether this key orders by `column`.
    #[must_use]
    pub fn is_on(self, column: place::Column) -> bool {
        same_column(self.column, column)
    }

    /// Ascending key.
    #[must_use]
    pub const fn asc(column: place::Column) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    /// Descending key.
    #[must_use]
    pub const fn desc(column: place::Column) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Owner join parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerLookup {
    /// Keep places whose owner row is missing.
    pub preserve_null: bool,
}

/// A pipeline stage.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Distance-annotated proximity search; implicitly sorts by distance.
    GeoNear(GeoNear),
    /// Conjunction of filters.
    Match(Vec<Filter>),
    /// Ordering.
    Sort(Vec<SortKey>),
    /// Number of rows to skip.
    Skip(u64),
    /// Maximum number of rows.
    Limit(u64),
    /// Join the owner's user row on `created_by`.
    LookupOwner(OwnerLookup),
    /// Place columns to return.
    Project(Vec<place::Column>),
    /// Replace rows with their count.
    Count,
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::GeoNear(a), Self::GeoNear(b)) => a == b,
            (Self::Match(a), Self::Match(b)) => a == b,
            (Self::Sort(a), Self::Sort(b)) => a == b,
            (Self::Skip(a), Self::Skip(b)) | (Self::Limit(a), Self::Limit(b)) => a == b,
            (Self::LookupOwner(a), Self::LookupOwner(b)) => a == b,
            (Self::Project(a), Self::Project(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_column(*x, *y))
            }
            (Self::Count, Self::Count) => true,
            _ => false,
        }
    }
}

impl Stage {
    /// Stage name used in errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GeoNear(_) => "geoNear",
            Self::Match(_) => "match",
            Self::Sort(_) => "sort",
            Self::Skip(_) => "skip",
            Self::Limit(_) => "limit",
            Self::LookupOwner(_) => "lookup",
            Self::Project(_) => "project",
            Self::Count => "count",
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::GeoNear(_) => 0,
            Self::Match(_) => 1,
            Self::Sort(_) => 2,
            Self::Skip(_) => 3,
            Self::Limit(_) => 4,
            Self::LookupOwner(_) => 5,
            Self::Project(_) => 6,
            Self::Count => 7,
        }
    }

    const fn is_filter(&self) -> bool {
        matches!(self, Self::GeoNear(_) | Self::Match(_))
    }
}

/// Incremental, validating pipeline builder.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    /// Append a stage, rejecting orderings the compiler cannot honour.
    pub fn push(&mut self, stage: Stage) -> Result<&mut Self, PipelineError> {
        self.check(&stage)?;
        self.stages.push(stage);
        Ok(self)
    }

    fn check(&self, stage: &Stage) -> Result<(), PipelineError> {
        match stage {
            Stage::GeoNear(geo) => {
                if !self.stages.is_empty() {
                    return Err(PipelineError::GeoNearNotFirst);
                }
                if !geo.max_distance_m.is_finite() || geo.max_distance_m <= 0.0 {
                    return Err(PipelineError::InvalidDistance);
                }
                return Ok(());
            }
            Stage::Sort(_) if self.has_geo_near() => return Err(PipelineError::SortWithGeoNear),
            Stage::Limit(0) => return Err(PipelineError::ZeroLimit),
            _ => {}
        }

        if let Some(last) = self.stages.last() {
            if stage.rank() < last.rank() {
                return Err(PipelineError::OutOfOrder {
                    stage: stage.name(),
                    previous: last.name(),
                });
            }
            if stage.rank() == last.rank() && !matches!(stage, Stage::Match(_)) {
                return Err(PipelineError::Duplicate(stage.name()));
            }
            if matches!(stage, Stage::Count)
                && !matches!(last, Stage::GeoNear(_) | Stage::Match(_) | Stage::Sort(_))
            {
                return Err(PipelineError::OutOfOrder {
                    stage: stage.name(),
                    previous: last.name(),
                });
            }
        }

        Ok(())
    }

    fn has_geo_near(&self) -> bool {
        matches!(self.stages.first(), Some(Stage::GeoNear(_)))
    }

    /// Copy of the stages pushed so far.
    #[must_use]
    pub fn snapshot(&self) -> Pipeline {
        Pipeline {
            stages: self.stages.clone(),
        }
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// A validated sequence of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Start a new pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The proximity stage, if the pipeline starts with one.
    #[must_use]
    pub fn geo_near(&self) -> Option<&GeoNear> {
        match self.stages.first() {
            Some(Stage::GeoNear(geo)) => Some(geo),
            _ => None,
        }
    }

    /// Whether this pipeline ends in a count.
    #[must_use]
    pub fn is_count(&self) -> bool {
        matches!(self.stages.last(), Some(Stage::Count))
    }

    /// Count variant sharing this pipeline's filter prefix.
    #[must_use]
    pub fn count_pipeline(&self) -> Self {
        let mut stages: Vec<Stage> = self
            .stages
            .iter()
            .take_while(|s| s.is_filter())
            .cloned()
            .collect();
        stages.push(Stage::Count);
        Self { stages }
    }

    /// Compile into a `PostgreSQL` statement.
    #[must_use]
    pub fn to_statement(&self) -> Statement {
        DbBackend::Postgres.build(&self.to_select())
    }

    /// Compile into a select statement.
    ///
    /// The owner join is emitted as a join on the paginated query; since each
    /// place has at most one owner row this is equivalent to joining after the
    /// limit.
    #[must_use]
    pub fn to_select(&self) -> SelectStatement {
        let mut select = Query::select();
        select.from(place::Entity);

        let mut distance: Option<SimpleExpr> = None;
        let mut orders: Vec<(SimpleExpr, Order)> = Vec::new();
        let mut projection: Option<&[place::Column]> = None;
        let mut owner_joined = false;
        let mut counting = false;

        for stage in &self.stages {
            match stage {
                Stage::GeoNear(geo) => {
                    let expr = distance_expr(geo.near);
                    if geo.only_active {
                        select.and_where(
                            Expr::col((place::Entity, place::Column::IsActive)).eq(true),
                        );
                    }
                    let bbox = geo.near.bounding_box(geo.max_distance_m);
                    select.and_where(
                        Expr::col((place::Entity, place::Column::Lat))
                            .between(bbox.min_lat, bbox.max_lat),
                    );
                    if let Some((min_lng, max_lng)) = bbox.lng_range {
                        select.and_where(
                            Expr::col((place::Entity, place::Column::Lng)).between(min_lng, max_lng),
                        );
                    }
                    select.and_where(Expr::expr(expr.clone()).lte(geo.max_distance_m));
                    orders.push((expr.clone(), Order::Asc));
                    orders.push((
                        Expr::col((place::Entity, place::Column::Id)).into(),
                        Order::Asc,
                    ));
                    distance = Some(expr);
                }
                Stage::Match(filters) => {
                    for filter in filters {
                        select.and_where(filter.to_expr());
                    }
                }
                Stage::Sort(keys) => {
                    for key in keys {
                        let order = if key.descending { Order::Desc } else { Order::Asc };
                        orders.push((Expr::col((place::Entity, key.column)).into(), order));
                    }
                }
                Stage::Skip(n) => {
                    select.offset(*n);
                }
                Stage::Limit(n) => {
                    select.limit(*n);
                }
                Stage::LookupOwner(lookup) => {
                    let join = if lookup.preserve_null {
                        JoinType::LeftJoin
                    } else {
                        JoinType::InnerJoin
                    };
                    select.join(
                        join,
                        user::Entity,
                        Expr::col((user::Entity, user::Column::Id))
                            .equals((place::Entity, place::Column::CreatedBy)),
                    );
                    owner_joined = true;
                }
                Stage::Project(columns) => projection = Some(columns),
                Stage::Count => counting = true,
            }
        }

        if counting {
            select.expr_as(Expr::cust("COUNT(*)"), Alias::new("total"));
            return select;
        }

        match projection {
            Some(columns) => {
                for column in columns {
                    select.column((place::Entity, *column));
                }
                // Always present so rows decode uniformly
                let distance_column = distance
                    .clone()
                    .unwrap_or_else(|| Expr::cust("NULL::double precision"));
                select.expr_as(distance_column, Alias::new("distance"));
            }
            None => {
                select.column((place::Entity, Asterisk));
                if let Some(expr) = distance.clone() {
                    select.expr_as(expr, Alias::new("distance"));
                }
            }
        }

        if owner_joined {
            for (column, alias) in [
                (user::Column::Id, "owner_id"),
                (user::Column::Username, "owner_username"),
                (user::Column::Name, "owner_name"),
                (user::Column::AvatarUrl, "owner_avatar_url"),
            ] {
                select.expr_as(Expr::col((user::Entity, column)), Alias::new(alias));
            }
        }

        for (expr, order) in orders {
            select.order_by_expr(expr, order);
        }

        select
    }
}

/// Haversine distance in meters from `point` to the place row.
///
/// `$1` is the latitude and `$2` the longitude, in degrees.
fn distance_expr(point: GeoPoint) -> SimpleExpr {
    Expr::cust_with_values(
        format!(
            r#"{EARTH_RADIUS_M} * 2 * ASIN(LEAST(1, SQRT(POWER(SIN(RADIANS("place"."lat" - $1) / 2), 2) + COS(RADIANS($1)) * COS(RADIANS("place"."lat")) * POWER(SIN(RADIANS("place"."lng" - $2) / 2), 2))))"#
        ),
        [point.lat(), point.lng()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(lat: f64, lng: f64, max_distance_m: f64) -> Stage {
        Stage::GeoNear(GeoNear {
            near: GeoPoint::new(lat, lng).unwrap(),
            max_distance_m,
            only_active: true,
        })
    }

    fn active() -> Stage {
        Stage::Match(vec![Filter::Eq(place::Column::IsActive, true.into())])
    }

    #[test]
    fn test_stages_compare_by_column() {
        assert_eq!(
            SortKey::desc(place::Column::ViewCount),
            SortKey::desc(place::Column::ViewCount)
        );
        assert_ne!(
            SortKey::desc(place::Column::ViewCount),
            SortKey::desc(place::Column::RatingCount)
        );
        assert_ne!(
            SortKey::asc(place::Column::Name),
            SortKey::desc(place::Column::Name)
        );
        assert!(SortKey::asc(place::Column::Name).is_on(place::Column::Name));

        assert_eq!(
            Filter::Gte(place::Column::MinPrice, 10.0.into()),
            Filter::Gte(place::Column::MinPrice, 10.0.into())
        );
        assert_ne!(
            Filter::Gte(place::Column::MinPrice, 10.0.into()),
            Filter::Gte(place::Column::MaxPrice, 10.0.into())
        );
        assert_ne!(
            Filter::Gte(place::Column::MinPrice, 10.0.into()),
            Filter::Lte(place::Column::MinPrice, 10.0.into())
        );

        let project = Stage::Project(vec![place::Column::Id, place::Column::Name]);
        assert_eq!(project, Stage::Project(vec![place::Column::Id, place::Column::Name]));
        assert_ne!(project, Stage::Project(vec![place::Column::Name, place::Column::Id]));
        assert_ne!(project, Stage::Project(vec![place::Column::Id]));
    }

    #[test]
    fn test_geo_near_must_be_first() {
        let mut builder = Pipeline::builder();
        builder.push(active()).unwrap();

        assert_eq!(
            builder.push(near(0.0, 0.0, 5_000.0)).unwrap_err(),
            PipelineError::GeoNearNotFirst
        );
    }

    #[test]
    fn test_geo_near_rejects_invalid_distance() {
        let mut builder = Pipeline::builder();
        assert_eq!(
            builder.push(near(0.0, 0.0, 0.0)).unwrap_err(),
            PipelineError::InvalidDistance
        );
        assert_eq!(
            builder.push(near(0.0, 0.0, f64::NAN)).unwrap_err(),
            PipelineError::InvalidDistance
        );
    }

    #[test]
    fn test_sort_rejected_with_geo_near() {
        let mut builder = Pipeline::builder();
        builder.push(near(10.0, 10.0, 1_000.0)).unwrap();
        builder.push(active()).unwrap();

        assert_eq!(
            builder
                .push(Stage::Sort(vec![SortKey::desc(place::Column::CreatedAt)]))
                .unwrap_err(),
            PipelineError::SortWithGeoNear
        );
    }

    #[test]
    fn test_match_after_pagination_rejected() {
        let mut builder = Pipeline::builder();
        builder.push(Stage::Skip(10)).unwrap();

        assert_eq!(
            builder.push(active()).unwrap_err(),
            PipelineError::OutOfOrder {
                stage: "match",
                previous: "skip"
            }
        );
    }

    #[test]
    fn test_duplicate_and_zero_limit_rejected() {
        let mut builder = Pipeline::builder();
        assert_eq!(
            builder.push(Stage::Limit(0)).unwrap_err(),
            PipelineError::ZeroLimit
        );
        builder.push(Stage::Limit(5)).unwrap();
        assert_eq!(
            builder.push(Stage::Limit(5)).unwrap_err(),
            PipelineError::Duplicate("limit")
        );
    }

    #[test]
    fn test_multiple_match_stages_allowed() {
        let mut builder = Pipeline::builder();
        builder.push(active()).unwrap();
        builder
            .push(Stage::Match(vec![Filter::Text("pho".to_string())]))
            .unwrap();
        assert_eq!(builder.build().stages().len(), 2);
    }

    #[test]
    fn test_count_cannot_follow_pagination() {
        let mut builder = Pipeline::builder();
        builder.push(active()).unwrap();
        builder.push(Stage::Limit(3)).unwrap();

        assert!(builder.push(Stage::Count).is_err());
    }

    #[test]
    fn test_count_pipeline_keeps_filter_prefix() {
        let mut builder = Pipeline::builder();
        builder.push(near(21.0, 105.8, 5_000.0)).unwrap();
        builder.push(active()).unwrap();
        builder.push(Stage::Skip(20)).unwrap();
        builder.push(Stage::Limit(10)).unwrap();
        builder
            .push(Stage::LookupOwner(OwnerLookup {
                preserve_null: true,
            }))
            .unwrap();
        let pipeline = builder.build();

        let count = pipeline.count_pipeline();
        let names: Vec<_> = count.stages().iter().map(Stage::name).collect();
        assert_eq!(names, vec!["geoNear", "match", "count"]);
        assert!(count.is_count());
        assert!(!pipeline.is_count());
        assert!(count.geo_near().is_some());
    }

    #[test]
    fn test_compile_plain_listing() {
        let mut builder = Pipeline::builder();
        builder
            .push(Stage::Match(vec![
                Filter::Eq(place::Column::IsActive, true.into()),
                Filter::Eq(place::Column::Category, "cafe".into()),
                Filter::Gte(place::Column::MinPrice, 100.0.into()),
            ]))
            .unwrap();
        builder
            .push(Stage::Sort(vec![
                SortKey::desc(place::Column::RatingAverage),
                SortKey::asc(place::Column::Id),
            ]))
            .unwrap();
        builder.push(Stage::Skip(20)).unwrap();
        builder.push(Stage::Limit(10)).unwrap();
        builder
            .push(Stage::LookupOwner(OwnerLookup {
                preserve_null: true,
            }))
            .unwrap();
        builder
            .push(Stage::Project(vec![place::Column::Id, place::Column::Name]))
            .unwrap();

        let sql = builder.build().to_statement().to_string();

        assert!(sql.contains(r#"SELECT "place"."id", "place"."name", NULL::double precision AS "distance""#));
        assert!(sql.contains(r#"LEFT JOIN "user" ON "user"."id" = "place"."created_by""#));
        assert!(sql.contains(r#""place"."is_active" = TRUE"#));
        assert!(sql.contains(r#""place"."category" = 'cafe'"#));
        assert!(sql.contains(r#""place"."min_price" >= 100"#));
        assert!(sql.contains(r#"ORDER BY "place"."rating_average" DESC, "place"."id" ASC"#));
        assert!(sql.contains("LIMIT 10"));
        assert!(sql.contains("OFFSET 20"));
        assert!(sql.contains(r#""user"."id" AS "owner_id""#));
    }

    #[test]
    fn test_compile_geo_listing_orders_by_distance() {
        let mut builder = Pipeline::builder();
        builder.push(near(21.0278, 105.8342, 5_000.0)).unwrap();
        builder.push(Stage::Limit(10)).unwrap();
        builder.push(Stage::Project(vec![place::Column::Id])).unwrap();

        let sql = builder.build().to_statement().to_string();

        assert!(sql.contains("ASIN(LEAST(1, SQRT("));
        assert!(sql.contains(r#""place"."lat" BETWEEN"#));
        assert!(sql.contains(r#""place"."lng" BETWEEN"#));
        assert!(sql.contains("<= 5000"));
        assert!(sql.contains(r#"AS "distance""#));
        let order_by = &sql[sql.find("ORDER BY").unwrap()..];
        assert!(order_by.contains("ASIN"));
        assert!(order_by.contains(r#""place"."id" ASC"#));
        assert!(!sql.contains("NULL::double precision"));
    }

    #[test]
    fn test_compile_count_has_no_order_or_projection() {
        let mut builder = Pipeline::builder();
        builder
            .push(Stage::Match(vec![
                Filter::Eq(place::Column::IsActive, true.into()),
                Filter::Text("banh mi".to_string()),
            ]))
            .unwrap();
        builder
            .push(Stage::Sort(vec![SortKey::desc(place::Column::CreatedAt)]))
            .unwrap();
        builder.push(Stage::Count).unwrap();

        let sql = builder.build().to_statement().to_string();

        assert!(sql.starts_with(r#"SELECT COUNT(*) AS "total" FROM "place""#));
        assert!(sql.contains("plainto_tsquery('simple', 'banh mi')"));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
    }
}
