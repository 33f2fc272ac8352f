//! Resolve which recurring daily window applies to a calendar date.

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::HostId;
use crate::store::SchedulingStore;
use crate::time::{day_of_week, DailyWindow};

/// The availability window `host` offers on `date`, if any.
///
/// The day of week is taken from the date alone (0 = Sunday). `None` means the
/// host has no hours that day, which callers treat as zero slots, not an error.
pub fn resolve<S>(store: &S, host: &HostId, date: NaiveDate) -> Result<Option<DailyWindow>>
where
    S: SchedulingStore + ?Sized,
{
    Ok(store
        .find_availability(host, day_of_week(date))?
        .map(|row| row.window))
}
