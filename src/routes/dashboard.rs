use std::sync::Arc;

use axum::Extension;
use serde::Serialize;

use crate::models::{Seminar, Totals};
use crate::state::AppState;
use crate::{proceeds, Payload};

const RECENT_SEMINARS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub totals: Totals,
    pub active_seminars: Vec<Seminar>,
    pub active_seminars_count: usize,
    pub recent_seminars: Vec<Seminar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
}

pub async fn home(Extension(state): Extension<Arc<AppState>>) -> Payload<Dashboard> {
    let totals = state.store.totals().await?;
    let active_seminars = state.store.active_seminars().await?;

    let mut recent_seminars = state.store.list_seminars().await?;
    recent_seminars.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    recent_seminars.truncate(RECENT_SEMINARS);

    proceeds(Dashboard {
        totals,
        active_seminars_count: active_seminars.len(),
        active_seminars,
        recent_seminars,
    })
}

pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Payload<Health> {
    state.store.ping().await?;
    proceeds(Health { status: "ok" })
}
