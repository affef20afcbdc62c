/// Test fixtures: representative input files, cfg(test) gated.
///
/// These mirror the real inputs in shape but are truncated to two
/// stations, three days and a three-member ensemble:
///
///   metadata.csv   — `station name`, `lisflood_x` (lon), `lisflood_y` (lat),
///                    then `obs_<severity>` / `glofas_<severity>` pairs
///   observed.csv   — `date` plus one discharge column per station (m³/s);
///                    blank cells are missing observations
///   forecast .csv  — `time`, `lat`, `lon`, then one `dis24_<n>` column per
///                    ensemble member, one row per day and grid cell
///
/// Thresholds are chosen so that each day lands on a different side of
/// the bankfull and moderate levels.

/// Two Limpopo basin stations with all three severity levels.
pub(crate) fn fixture_metadata_csv() -> &'static str {
    "station name,lisflood_x,lisflood_y,obs_bankfull,glofas_bankfull,obs_moderate,glofas_moderate,obs_severe,glofas_severe,basin
Chokwe,33.025,-24.525,1500,1200,2500,2100,4000,3600,Limpopo
Magude,32.625,-25.025,800,700,1400,1250,2300,2000,Incomati
"
}

/// Observed discharge for both stations. Magude has no reading on the 5th.
pub(crate) fn fixture_observed_csv() -> &'static str {
    "date,Chokwe,Magude
2021-01-04,1600,900
2021-01-05,2600,
2021-01-06,1400,1500
"
}

/// Observed series with an extra gauge that has no metadata entry.
pub(crate) fn fixture_observed_extra_station_csv() -> &'static str {
    "date,Chokwe,Magude,Sabie
2021-01-04,1600,900,120
"
}

/// Observed series missing the Magude column entirely.
pub(crate) fn fixture_observed_missing_station_csv() -> &'static str {
    "date,Chokwe
2021-01-04,1600
2021-01-05,2600
"
}

/// Three-member forecast issued 2021-01-04, covering both station cells.
pub(crate) fn fixture_forecast_csv() -> &'static str {
    "time,lat,lon,dis24_0,dis24_1,dis24_2
2021-01-04,-24.525,33.025,1300,1100,2200
2021-01-04,-25.025,32.625,650,720,710
2021-01-05,-24.525,33.025,2150,2050,2300
2021-01-05,-25.025,32.625,800,900,1300
2021-01-06,-24.525,33.025,900,1000,1250
2021-01-06,-25.025,32.625,1300,1260,1240
"
}

/// Forecast whose grid does not include the Magude cell.
pub(crate) fn fixture_forecast_missing_cell_csv() -> &'static str {
    "time,lat,lon,dis24_0,dis24_1,dis24_2
2021-01-04,-24.525,33.025,1300,1100,2200
2021-01-05,-24.525,33.025,2150,2050,2300
2021-01-06,-24.525,33.025,900,1000,1250
"
}

/// Forecast with only two members, for ensemble size checks.
pub(crate) fn fixture_forecast_two_members_csv() -> &'static str {
    "time,lat,lon,dis24_0,dis24_1
2021-01-04,-24.525,33.025,1300,1100
2021-01-04,-25.025,32.625,650,720
"
}
