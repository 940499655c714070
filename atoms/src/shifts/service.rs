use chrono::NaiveDate;

use super::model::{CreateShiftPayload, Shift};
use crate::store::DataStore;
use crate::time::Clock;
use crate::{EngineError, Result};

/// Create a scheduled shift. Scheduling is plain CRUD; it does not
/// interact with the attendance state machine.
pub async fn create_shift(
    store: &dyn DataStore,
    clock: &dyn Clock,
    company_id: &str,
    payload: CreateShiftPayload,
) -> Result<Shift> {
    let shift = Shift {
        shift_id: uuid::Uuid::new_v4().to_string(),
        company_id: company_id.to_string(),
        name: payload.name,
        shift_type: payload.shift_type,
        date: payload.date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        assigned_to: payload.assigned_to,
        created_at: clock.now(),
    };
    store.put_shift(&shift).await?;
    Ok(shift)
}

pub async fn shifts_for_company(store: &dyn DataStore, company_id: &str) -> Result<Vec<Shift>> {
    store.shifts_for_company(company_id).await
}

pub async fn shifts_on(
    store: &dyn DataStore,
    company_id: &str,
    date: NaiveDate,
) -> Result<Vec<Shift>> {
    let shifts = store.shifts_for_company(company_id).await?;
    Ok(shifts.into_iter().filter(|s| s.date == date).collect())
}

pub async fn delete_shift(store: &dyn DataStore, company_id: &str, shift_id: &str) -> Result<()> {
    let shifts = store.shifts_for_company(company_id).await?;
    if !shifts.iter().any(|s| s.shift_id == shift_id) {
        return Err(EngineError::not_found("shift", shift_id));
    }
    store.delete_shift(shift_id).await
}
