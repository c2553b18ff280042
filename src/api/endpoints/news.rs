//! `GET /api/news`: proxied health headlines with browse filters.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::news::{self, NewsFilter, NewsPage, NewsQuery};

#[derive(Deserialize)]
pub struct NewsParams {
    pub country: Option<String>,
    pub category: Option<String>,
    pub max: Option<u32>,
    pub q: Option<String>,
    pub page: Option<usize>,
    #[serde(default)]
    pub filter: NewsFilter,
    pub search: Option<String>,
}

impl NewsParams {
    fn upstream_query(&self) -> NewsQuery {
        let defaults = NewsQuery::default();
        NewsQuery {
            country: self.country.clone().unwrap_or(defaults.country),
            category: self.category.clone().unwrap_or(defaults.category),
            max: self.max.unwrap_or(defaults.max),
            q: self.q.clone(),
            page: self.page.unwrap_or(defaults.page),
        }
    }
}

pub async fn headlines(
    State(ctx): State<ApiContext>,
    Query(params): Query<NewsParams>,
) -> Result<Json<NewsPage>, ApiError> {
    let query = params.upstream_query();
    let articles = ctx.core.news.fetch(&query).await?;
    Ok(Json(news::browse(
        articles,
        params.filter,
        params.search.as_deref(),
        query.page,
    )))
}
