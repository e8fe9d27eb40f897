use attendance_client::clock::SystemClock;
use attendance_client::config::Config;
use attendance_client::http_client::ReqwestAttendanceClient;
use attendance_client::preferences::PreferenceStore;
use attendance_client::sessions::SessionMatcher;
use attendance_server::InstrumentedApi;
use attendance_server::checkin::CheckInSession;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let directive = attendance_server::init_tracing();
    tracing::debug!(%directive, "attendance: log filter");

    let config = Config::from_env()?;
    let api = InstrumentedApi::new(ReqwestAttendanceClient::from_config(&config));
    let store = PreferenceStore::in_dir(&config.prefs_dir);
    let clock = SystemClock;

    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    let outcome = CheckInSession::new(&api, &store, &clock, input, output)
        .run(SessionMatcher::default())
        .await?;
    tracing::debug!(
        row = ?outcome.row_number,
        checked_in_today = outcome.today.len(),
        "attendance: done"
    );

    Ok(())
}
