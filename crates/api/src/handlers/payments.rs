use axum::extract::State;
use innkeep_core::{
    BookingEngine, Error, NewPayment, Payment, PaymentFilter, PaymentState, PermissionMatrix,
    StaffAction,
};
use uuid::Uuid;

use super::ApiResult;
use crate::dto::{PaymentInput, PaymentStatusRequest, ReasonRequest};
use crate::envelope::Reply;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Caller};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(filter): ApiQuery<PaymentFilter>,
) -> ApiResult<Vec<Payment>> {
    PermissionMatrix::require(&ctx, StaffAction::ViewPayments)?;
    let payments = state.run(move |db| db.payments().list(&filter)).await?;
    Ok(Reply::ok("Payments", payments))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Payment> {
    PermissionMatrix::require(&ctx, StaffAction::ViewPayments)?;
    let payment = state
        .run(move |db| {
            db.payments()
                .find_by_id(id)?
                .ok_or_else(|| Error::not_found("Payment", id))
        })
        .await?;
    Ok(Reply::ok("Payment", payment))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(input): ApiJson<PaymentInput>,
) -> ApiResult<Payment> {
    PermissionMatrix::require(&ctx, StaffAction::ManagePayments)?;
    let mut req = NewPayment::new(input.reservation_id, input.amount, input.payment_method);
    if let Some(kind) = input.payment_type {
        req.kind = kind;
    }
    req.currency = input.currency;
    req.transaction_id = input.transaction_id;
    req.notes = input.notes;
    if let Some(status) = input.status {
        req.status = status;
    }

    let payment = state
        .run(move |db| BookingEngine::new(db).record_payment(req))
        .await?;
    Ok(Reply::created("Payment recorded", payment))
}

pub async fn set_status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<PaymentStatusRequest>,
) -> ApiResult<Payment> {
    let action = if req.status == PaymentState::Refunded {
        StaffAction::RefundPayments
    } else {
        StaffAction::ManagePayments
    };
    PermissionMatrix::require(&ctx, action)?;
    let payment = state
        .run(move |db| BookingEngine::new(db).update_payment_status(id, req.status))
        .await?;
    Ok(Reply::ok("Payment status updated", payment))
}

pub async fn refund(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Payment> {
    PermissionMatrix::require(&ctx, StaffAction::RefundPayments)?;
    let reason = body.and_then(|ApiJson(req)| req.reason);
    let payment = state
        .run(move |db| BookingEngine::new(db).refund_payment(id, reason))
        .await?;
    Ok(Reply::ok("Payment refunded", payment))
}
