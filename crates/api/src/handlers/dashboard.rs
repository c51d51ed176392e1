use axum::extract::State;
use innkeep_core::{DashboardSummary, PermissionMatrix, StaffAction};

use super::ApiResult;
use crate::dto::DayQuery;
use crate::envelope::Reply;
use crate::extract::{ApiQuery, Caller};
use crate::state::AppState;

pub async fn summary(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(q): ApiQuery<DayQuery>,
) -> ApiResult<DashboardSummary> {
    PermissionMatrix::require(&ctx, StaffAction::ViewDashboard)?;
    let today = q.day();
    let summary = state.run(move |db| db.dashboard().summary(today)).await?;
    Ok(Reply::ok("Dashboard", summary))
}
