//! Interactive explore session.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles the one-shot subcommands
//! - the session provides a small line-oriented prompt for switching years and
//!   filters without restarting
//!
//! Fetched year sets are kept in a `FetchCache` for the session, so switching
//! back to a previous selection does not hit the API again until the TTL runs out.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use clap::ValueEnum;

use crate::app::pipeline::Dataset;
use crate::data::{CacheKey, CacheStatus, FetchCache, PageSource, Rem20Client};
use crate::domain::Metric;
use crate::error::{AppError, EXIT_IO};
use crate::indicators::{DEFAULT_DISCREPANCY_THRESHOLD, find_discrepancies};
use crate::report::{
    self, DEFAULT_OTHER_SHARE, DEFAULT_TOP_FACILITIES, NO_DATA_MESSAGE, RecordFilter,
};

const HELP: &str = "\
Commands:
  years Y [Y ...]   select periods (e.g. `years 2024 2025`)
  all               select every period (no year filter)
  service NAME|*    filter by health service (`*` clears)
  area NAME|*       filter by functional area (`*` clears)
  services          list health services in the loaded data
  kpi               key indicators
  trend [METRIC]    monthly trend (occupancy, avg-stay, lethality, discharges, ...)
  areas             discharges by functional area
  top               top facilities by occupancy
  check             upstream vs recomputed indicator mismatches
  refresh           drop cached data for the current periods
  clear             drop all cached data
  help              this text
  quit              leave
";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Years(Vec<i32>),
    AllYears,
    Service(Option<String>),
    Area(Option<String>),
    Services,
    Kpi,
    Trend(Metric),
    Areas,
    Top,
    Check,
    Refresh,
    ClearCache,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    let command = match cmd.to_ascii_lowercase().as_str() {
        "years" | "year" => {
            let years = rest
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<i32>().map_err(|_| format!("Invalid year '{s}'.")))
                .collect::<Result<Vec<_>, _>>()?;
            if years.is_empty() {
                return Err("Usage: years Y [Y ...]".to_string());
            }
            SessionCommand::Years(years)
        }
        "all" => SessionCommand::AllYears,
        "service" => SessionCommand::Service(filter_value("service", rest)?),
        "area" => SessionCommand::Area(filter_value("area", rest)?),
        "services" => SessionCommand::Services,
        "kpi" | "kpis" => SessionCommand::Kpi,
        "trend" => {
            if rest.is_empty() {
                SessionCommand::Trend(Metric::Occupancy)
            } else {
                SessionCommand::Trend(Metric::from_str(rest, true).map_err(|_| {
                    let names: Vec<String> = Metric::ALL
                        .iter()
                        .filter_map(|m| m.to_possible_value().map(|v| v.get_name().to_string()))
                        .collect();
                    format!("Unknown metric '{rest}'. Choose one of: {}", names.join(", "))
                })?)
            }
        }
        "areas" => SessionCommand::Areas,
        "top" => SessionCommand::Top,
        "check" => SessionCommand::Check,
        "refresh" => SessionCommand::Refresh,
        "clear" => SessionCommand::ClearCache,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => return Err(format!("Unknown command '{other}'. Type `help` for a list.")),
    };
    Ok(Some(command))
}

fn filter_value(name: &str, rest: &str) -> Result<Option<String>, String> {
    match rest {
        "" => Err(format!("Usage: {name} NAME|*")),
        "*" => Ok(None),
        value => Ok(Some(value.to_string())),
    }
}

pub struct Session<S: PageSource> {
    client: Rem20Client<S>,
    cache: FetchCache,
    years: Vec<i32>,
    filter: RecordFilter,
    top_n: usize,
    threshold: f64,
    plot_width: usize,
    plot_height: usize,
}

impl<S: PageSource> Session<S> {
    pub fn new(client: Rem20Client<S>, cache_ttl: Duration, years: Vec<i32>) -> Self {
        Self {
            client,
            cache: FetchCache::new(cache_ttl),
            years,
            filter: RecordFilter::default(),
            top_n: DEFAULT_TOP_FACILITIES,
            threshold: DEFAULT_DISCREPANCY_THRESHOLD,
            plot_width: 72,
            plot_height: 16,
        }
    }

    #[cfg(test)]
    fn client(&self) -> &Rem20Client<S> {
        &self.client
    }

    /// Read commands from `input` until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<(), AppError> {
        writeln!(out, "rem20 explore: type `help` for commands").map_err(io_err)?;
        loop {
            write!(out, "rem20> ").map_err(io_err)?;
            out.flush().map_err(io_err)?;

            let mut line = String::new();
            if input.read_line(&mut line).map_err(io_err)? == 0 {
                writeln!(out).map_err(io_err)?;
                break;
            }

            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(SessionCommand::Quit)) => break,
                Ok(Some(cmd)) => {
                    let text = self.execute(cmd);
                    write!(out, "{text}").map_err(io_err)?;
                }
                Err(msg) => writeln!(out, "{msg}").map_err(io_err)?,
            }
        }
        Ok(())
    }

    /// Apply one command and return what should be printed.
    pub fn execute(&mut self, cmd: SessionCommand) -> String {
        match cmd {
            SessionCommand::Years(years) => {
                self.years = years;
                format!("Periods set to {:?}\n", self.years)
            }
            SessionCommand::AllYears => {
                self.years.clear();
                "Periods set to all\n".to_string()
            }
            SessionCommand::Service(service) => {
                self.filter.service = service;
                format!("Service filter: {}\n", self.filter.service.as_deref().unwrap_or("All"))
            }
            SessionCommand::Area(area) => {
                self.filter.area = area;
                format!("Area filter: {}\n", self.filter.area.as_deref().unwrap_or("All"))
            }
            SessionCommand::Refresh => {
                let key = CacheKey::new(&self.years);
                if self.cache.invalidate(&key) {
                    "Cached data dropped; next command refetches.\n".to_string()
                } else {
                    "Nothing cached for these periods.\n".to_string()
                }
            }
            SessionCommand::ClearCache => {
                let n = self.cache.len();
                self.cache.clear();
                format!("Dropped {n} cached period set(s).\n")
            }
            SessionCommand::Help => HELP.to_string(),
            SessionCommand::Quit => String::new(),
            data_cmd => self.report(data_cmd),
        }
    }

    fn report(&mut self, cmd: SessionCommand) -> String {
        let dataset = self.dataset();
        let mut out = report::format_fetch_errors(&dataset.errors);
        if dataset.is_empty() {
            out.push_str(NO_DATA_MESSAGE);
            out.push('\n');
            return out;
        }

        if cmd == SessionCommand::Services {
            for s in report::distinct_services(&dataset.records) {
                out.push_str(&format!("- {s}\n"));
            }
            return out;
        }

        let records = self.filter.apply(&dataset.records);
        out.push_str(&report::format_run_header(
            &dataset.years,
            &self.filter,
            dataset.records.len(),
            records.len(),
        ));
        out.push('\n');

        match cmd {
            SessionCommand::Kpi => out.push_str(&report::format_kpis(&report::compute_kpis(&records))),
            SessionCommand::Trend(metric) => {
                let points = report::trend(&records, metric);
                out.push_str(&report::format_trend_table(&points, metric));
                out.push('\n');
                out.push_str(&crate::plot::render_trend_plot(&points, self.plot_width, self.plot_height));
            }
            SessionCommand::Areas => out.push_str(&report::format_areas(&report::area_distribution(
                &records,
                DEFAULT_OTHER_SHARE,
            ))),
            SessionCommand::Top => out.push_str(&report::format_facilities(&report::top_facilities(&records, self.top_n))),
            SessionCommand::Check => {
                let found = find_discrepancies(&records, self.threshold);
                out.push_str(&report::format_discrepancies(&records, &found, self.threshold, 20));
            }
            _ => {}
        }
        out
    }

    fn dataset(&mut self) -> Dataset {
        let now = Instant::now();
        let purged = self.cache.purge_expired(now);
        if purged > 0 {
            log::debug!("Dropped {purged} expired cache entr(ies); {} left", self.cache.len());
        }

        // The key only normalizes the lookup; fetch order follows the user's input.
        let key = CacheKey::new(&self.years);
        let years = &self.years;
        let client = &self.client;
        let (outcome, status) = self
            .cache
            .get_or_fetch(&key, now, |_| client.fetch(years));
        if status == CacheStatus::Hit {
            log::debug!("Serving periods {years:?} from cache");
        }
        Dataset::from_outcome(years, outcome)
    }
}

fn io_err(e: std::io::Error) -> AppError {
    AppError::new(EXIT_IO, format!("Terminal I/O error: {e}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::client::fake::{FakeSource, record};

    fn source() -> FakeSource {
        let mut source = FakeSource::default();
        source.data.insert(
            Some(2025),
            vec![
                record(&[
                    ("PERIODO", json!("2025")),
                    ("MES", json!("1")),
                    ("GLOSA_SSS", json!("Maule")),
                    ("AREA_FUNCIONAL", json!("Medicina")),
                    ("ESTABLECIMIENTO", json!("Hospital de Talca")),
                    ("INDICE_OCUPACIONAL", json!("85.0")),
                    ("NUMERO_EGRESOS", json!("10")),
                ]),
                record(&[
                    ("PERIODO", json!("2025")),
                    ("MES", json!("2")),
                    ("GLOSA_SSS", json!("Biobio")),
                    ("AREA_FUNCIONAL", json!("Cirugia")),
                    ("ESTABLECIMIENTO", json!("Hospital de Los Angeles")),
                    ("INDICE_OCUPACIONAL", json!("75.0")),
                    ("NUMERO_EGRESOS", json!("30")),
                ]),
            ],
        );
        source
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(
            parse_command("years 2024, 2025"),
            Ok(Some(SessionCommand::Years(vec![2024, 2025])))
        );
        assert_eq!(
            parse_command("service Servicio de Salud Maule"),
            Ok(Some(SessionCommand::Service(Some("Servicio de Salud Maule".to_string()))))
        );
        assert_eq!(parse_command("area *"), Ok(Some(SessionCommand::Area(None))));
        assert_eq!(
            parse_command("trend avg-stay"),
            Ok(Some(SessionCommand::Trend(Metric::AvgStay)))
        );
        assert_eq!(parse_command("TREND"), Ok(Some(SessionCommand::Trend(Metric::Occupancy))));
        assert!(parse_command("years abc").is_err());
        assert!(parse_command("trend beds").unwrap_err().contains("occupancy"));
        assert_eq!(parse_command("clear"), Ok(Some(SessionCommand::ClearCache)));
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn repeated_reports_hit_the_cache() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2025]);

        let mut out = Vec::new();
        session
            .run("kpi\nareas\nrefresh\ntop\nquit\n".as_bytes(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Key indicators:"));
        assert!(text.contains("Total discharges: 40"));
        assert!(text.contains("Discharges by functional area:"));
        assert!(text.contains("Cached data dropped"));
        assert!(text.contains("Top 2 facilities by occupancy:"));
        // kpi fetches, areas is cached, refresh drops, top fetches again.
        assert_eq!(session.client().source().call_count(), 2);
    }

    #[test]
    fn filters_narrow_the_report() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2025]);

        session.execute(SessionCommand::Service(Some("Maule".to_string())));
        let text = session.execute(SessionCommand::Kpi);
        assert!(text.contains("Records: 1 shown of 2 loaded"));
        assert!(text.contains("Occupancy index : 85.0%"));
        assert_eq!(session.filter.service.as_deref(), Some("Maule"));
    }

    #[test]
    fn clear_drops_every_cached_selection() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2025]);

        let mut out = Vec::new();
        session
            .run("kpi\nyears 2024\nkpi\nclear\nkpi\n".as_bytes(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Dropped 2 cached period set(s)."));
        assert_eq!(session.cache.len(), 1);
        assert_eq!(session.client().source().call_count(), 3);
    }

    #[test]
    fn zero_ttl_session_holds_no_entries() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::ZERO, vec![2025]);

        let mut out = Vec::new();
        session
            .run("years 2020\nkpi\nyears 2021\nkpi\nyears 2025\nkpi\nkpi\n".as_bytes(), &mut out)
            .unwrap();
        assert!(session.cache.is_empty());
        assert_eq!(session.client().source().call_count(), 4);
    }

    #[test]
    fn expired_entries_are_purged_on_next_load() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_millis(20), vec![2025]);
        session.cache.insert(CacheKey::new(&[2019]), Vec::new(), Instant::now());
        std::thread::sleep(Duration::from_millis(40));

        session.execute(SessionCommand::Kpi);
        assert_eq!(session.cache.len(), 1);
        assert!(!session.cache.invalidate(&CacheKey::new(&[2019])));
        assert!(session.cache.invalidate(&CacheKey::new(&[2025])));
    }

    #[test]
    fn fetch_and_header_follow_the_typed_year_order() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2025, 2024]);

        let text = session.execute(SessionCommand::Kpi);
        let years: Vec<_> = session.client().source().calls.borrow().iter().map(|q| q.year).collect();
        assert_eq!(years, vec![Some(2025), Some(2024)]);
        assert!(text.contains("Periods: 2025, 2024\n"));
    }

    #[test]
    fn unknown_years_print_no_data() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2019]);
        let text = session.execute(SessionCommand::Top);
        assert!(text.contains(NO_DATA_MESSAGE));
    }

    #[test]
    fn end_of_input_ends_the_session() {
        let client = Rem20Client::new(source(), 100);
        let mut session = Session::new(client, Duration::from_secs(600), vec![2025]);
        let mut out = Vec::new();
        session.run("help\n".as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Commands:"));
    }
}
