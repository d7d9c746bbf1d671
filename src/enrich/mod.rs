use anyhow::{Result, bail};
use std::thread;
use std::time::Duration;

use crate::api::Geocoder;
use crate::table::{ADDRESS_COLUMN, LAT_COLUMN, LON_COLUMN, RowSet};

/// Pause between row-level lookups to stay under the service rate limit.
pub const COURTESY_PAUSE: Duration = Duration::from_millis(100);

/// Counters reported after an enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    /// Rows in the input, including skipped ones
    pub total: usize,
    /// Rows a lookup was issued for
    pub attempted: usize,
    /// Rows whose coordinate cells were overwritten
    pub updated: usize,
}

/// Fill in missing coordinates across `rows`.
///
/// Rows already carrying both coordinates, and rows without an address,
/// are skipped without a lookup. A failed lookup leaves the row
/// untouched; the run always continues to the next row. Existing
/// coordinate values are never overwritten.
///
/// `pause` is slept after every attempted row; pass
/// [`COURTESY_PAUSE`] when talking to the live service.
pub fn enrich_rows(
    rows: &mut RowSet,
    geocoder: &mut dyn Geocoder,
    pause: Duration,
) -> Result<EnrichStats> {
    let (Some(address_idx), Some(lat_idx), Some(lon_idx)) = (
        rows.column_index(ADDRESS_COLUMN),
        rows.column_index(LAT_COLUMN),
        rows.column_index(LON_COLUMN),
    ) else {
        let missing: Vec<&str> = [ADDRESS_COLUMN, LAT_COLUMN, LON_COLUMN]
            .into_iter()
            .filter(|column| rows.column_index(column).is_none())
            .collect();
        bail!("CSV is missing required columns: {}", missing.join(", "));
    };

    let mut stats = EnrichStats {
        total: rows.len(),
        ..EnrichStats::default()
    };

    for row in 0..rows.len() {
        let has_lat = !rows.value(row, lat_idx).trim().is_empty();
        let has_lon = !rows.value(row, lon_idx).trim().is_empty();
        if has_lat && has_lon {
            continue;
        }

        let address = rows.value(row, address_idx).trim().to_string();
        if address.is_empty() {
            continue;
        }

        stats.attempted += 1;
        if let Some(coords) = geocoder.resolve(&address) {
            rows.set_value(row, lat_idx, format!("{:.7}", coords.lat));
            rows.set_value(row, lon_idx, format!("{:.7}", coords.lon));
            stats.updated += 1;
        }
        // Be kind to the API between lookups
        thread::sleep(pause);
    }

    Ok(stats)
}
