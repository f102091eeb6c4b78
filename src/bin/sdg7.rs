use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use num_format::{Locale, ToFormattedString};
use sdg7_rs::projection::{self, ProjectionRequest};
use sdg7_rs::views::{self, MAX_SERIES_COUNTRIES};
use sdg7_rs::{Catalog, DateSpec, IndicatorAccessor, IndicatorDescriptor, LongDataset, LongRecord};
use sdg7_rs::{catalog, chart, join, stats, storage};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Countries projected when `--countries` is omitted.
const DEFAULT_PROJECT_COUNTRIES: usize = 4;

#[derive(Parser, Debug)]
#[command(
    name = "sdg7",
    version,
    about = "Reshape, compare & project World Bank SDG 7 indicators"
)]
struct Cli {
    /// Directory holding the indicator CSV files of the built-in catalog.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
    /// JSON catalog to use instead of the built-in indicator list.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Number formatting locale (en, de, fr, es, it, pt, nl).
    #[arg(long, global = true, default_value = "en")]
    locale: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered indicators.
    Indicators,
    /// Values of one indicator for every country in one year.
    Map(MapArgs),
    /// Time series of one indicator for a few countries.
    Series(SeriesArgs),
    /// Two indicators side by side in one year, with their correlation.
    Compare(CompareArgs),
    /// Project emissions and renewable share to a target year.
    Project(ProjectArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Indicator display name or value column (e.g., gdp_per_capita)
    #[arg(short, long)]
    indicator: String,
    /// Year (YYYY). Defaults to the latest year with data.
    #[arg(short, long)]
    year: Option<i32>,
    /// Save the year's rows to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    /// Indicator display name or value column
    #[arg(short, long)]
    indicator: String,
    /// Country names or codes separated by comma or semicolon (at most 5 are used)
    #[arg(short, long)]
    countries: Option<String>,
    /// Create an SVG chart at the given path.
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Width of the plot (default 1000).
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of the plot (default 600).
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Print per-country statistics.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Indicator on the X axis
    #[arg(short, long)]
    x: String,
    /// Indicator on the Y axis
    #[arg(short, long)]
    y: String,
    /// Year (YYYY). Defaults to the latest year both indicators share.
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Args, Debug)]
struct ProjectArgs {
    /// Country names or codes separated by comma or semicolon (default: first 4 by name)
    #[arg(short, long)]
    countries: Option<String>,
    /// First year to fit. Defaults to max(first year with data, 2005).
    #[arg(long)]
    from: Option<i32>,
    /// Last year to fit. Defaults to the last year with data.
    #[arg(long)]
    to: Option<i32>,
    /// Year to project to.
    #[arg(long, default_value_t = projection::DEFAULT_TARGET_YEAR)]
    target: i32,
    /// Fit the response on its natural scale instead of ln(response).
    #[arg(long, default_value_t = false)]
    no_log: bool,
    /// Response indicator.
    #[arg(long, default_value = catalog::CO2_TOTAL)]
    response: String,
    /// Predictor indicator.
    #[arg(long, default_value = catalog::RENEWABLES_SHARE)]
    predictor: String,
    /// Save the report (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// SVG chart of the response history and projections.
    #[arg(long)]
    plot: Option<PathBuf>,
    /// SVG chart of the predictor history and projections.
    #[arg(long)]
    plot_predictor: Option<PathBuf>,
}

/// Map a user-provided locale tag to a num-format Locale and decimal separator.
/// Supported tags (case-insensitive): "en", "us", "en_US", "de", "de_DE", "german", "fr", "es", "it", "pt", "nl"
fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'),
    }
}

/// Formats numbers with thousands separators and two decimals.
struct NumFmt {
    locale: &'static Locale,
    decimal: char,
}

impl NumFmt {
    fn new(tag: &str) -> Self {
        let (locale, decimal) = map_locale(tag);
        Self { locale, decimal }
    }

    fn num(&self, v: f64) -> String {
        if !v.is_finite() {
            return "NA".to_string();
        }
        let cents = (v.abs() * 100.0).round() as i64;
        let sign = if v < 0.0 && cents != 0 { "-" } else { "" };
        format!(
            "{}{}{}{:02}",
            sign,
            (cents / 100).to_formatted_string(self.locale),
            self.decimal,
            cents % 100
        )
    }

    fn opt(&self, v: Option<f64>) -> String {
        v.map(|x| self.num(x)).unwrap_or_else(|| "NA".to_string())
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn load_catalog(cli: &Cli) -> Result<Catalog> {
    match &cli.catalog {
        Some(path) => Catalog::from_json_path(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(Catalog::reference(&cli.data_dir)),
    }
}

fn resolve<'a>(accessor: &'a IndicatorAccessor, key: &str) -> Result<&'a IndicatorDescriptor> {
    accessor.catalog().resolve(key).ok_or_else(|| {
        let known: Vec<&str> = accessor.catalog().names().collect();
        anyhow!(
            "unknown indicator '{}'; known indicators: {}",
            key,
            known.join(" | ")
        )
    })
}

fn dataset(accessor: &IndicatorAccessor, desc: &IndicatorDescriptor) -> Result<LongDataset> {
    accessor
        .get_dataset(&desc.name)
        .with_context(|| format!("loading '{}'", desc.name))
}

fn save_dataset(ds: &LongDataset, path: &Path, format: Option<&OutFormat>) -> Result<()> {
    match out_format(path, format)?.as_str() {
        "csv" => storage::save_csv(ds, path)?,
        _ => storage::save_json(ds, path)?,
    }
    eprintln!("Saved {} rows to {}", ds.len(), path.display());
    Ok(())
}

fn out_format(path: &Path, format: Option<&OutFormat>) -> Result<String> {
    let fmt = match format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" | "json" => Ok(fmt),
        other => anyhow::bail!("unsupported format: {}", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let accessor = IndicatorAccessor::new(load_catalog(&cli)?).with_cache();
    let fmt = NumFmt::new(&cli.locale);
    match &cli.cmd {
        Command::Indicators => cmd_indicators(&accessor),
        Command::Map(args) => cmd_map(&accessor, args, &fmt),
        Command::Series(args) => cmd_series(&accessor, args, &fmt),
        Command::Compare(args) => cmd_compare(&accessor, args, &fmt),
        Command::Project(args) => cmd_project(&accessor, args, &fmt),
    }
}

fn cmd_indicators(accessor: &IndicatorAccessor) -> Result<()> {
    for d in accessor.catalog().entries() {
        println!("{}\t{}\t{}", d.value_column, d.name, d.source.display());
    }
    Ok(())
}

fn cmd_map(accessor: &IndicatorAccessor, args: &MapArgs, fmt: &NumFmt) -> Result<()> {
    let desc = resolve(accessor, &args.indicator)?;
    let ds = dataset(accessor, desc)?;
    let year = match args.year {
        Some(y) => y,
        None => *views::available_years(&ds)
            .last()
            .ok_or_else(|| anyhow!("'{}' has no data", desc.name))?,
    };
    let slice = views::year_slice(&ds, year);
    println!(
        "{} - {}: data for {} countries",
        desc.name,
        year,
        slice.len()
    );
    for r in &slice {
        println!("{}\t{}\t{}", r.country_code, r.country_name, fmt.num(r.value));
    }
    if let Some(path) = &args.out {
        save_dataset(&slice, path, args.format.as_ref())?;
    }
    Ok(())
}

fn cmd_series(accessor: &IndicatorAccessor, args: &SeriesArgs, fmt: &NumFmt) -> Result<()> {
    let desc = resolve(accessor, &args.indicator)?;
    let ds = dataset(accessor, desc)?;
    let countries = match &args.countries {
        Some(s) => parse_list(s),
        None => views::country_names(&ds),
    };
    let rows = views::series_for(&ds, &countries, MAX_SERIES_COUNTRIES);
    if rows.is_empty() {
        anyhow::bail!("no data for the selected countries");
    }
    for r in &rows {
        println!("{}\t{}\t{}", r.country_name, r.year, fmt.num(r.value));
    }
    let latest = views::latest_values(&rows);
    if let Some(first) = latest.first() {
        println!("Values in the latest year available ({}):", first.year);
        for r in &latest {
            println!("  {}: {}", r.country_name, fmt.num(r.value));
        }
    }

    if args.stats {
        let subset = LongDataset::from_records(ds.value_column(), rows.clone());
        for s in stats::country_summary(&subset) {
            println!(
                "{} {}-{}  count={}  min={} max={} mean={} median={}",
                s.country_code,
                s.first_year,
                s.last_year,
                s.count,
                fmt.num(s.min),
                fmt.num(s.max),
                fmt.num(s.mean),
                fmt.num(s.median)
            );
        }
    }

    if let Some(path) = &args.plot {
        chart::plot_series(
            &rows,
            &[],
            &desc.name,
            &desc.value_column,
            path,
            args.width,
            args.height,
        )?;
        eprintln!("Wrote plot to {}", path.display());
    }
    Ok(())
}

fn cmd_compare(accessor: &IndicatorAccessor, args: &CompareArgs, fmt: &NumFmt) -> Result<()> {
    let dx = resolve(accessor, &args.x)?;
    let dy = resolve(accessor, &args.y)?;
    let joined = join::join(&dataset(accessor, dx)?, &dataset(accessor, dy)?);
    let year = match args.year {
        Some(y) => y,
        None => views::latest_joined_year(&joined)
            .ok_or_else(|| anyhow!("'{}' and '{}' share no country-years", dx.name, dy.name))?,
    };
    let cmp = views::comparison(&joined, year);
    println!(
        "{} vs {} in {}: records for {} countries",
        dy.name,
        dx.name,
        year,
        cmp.rows.len()
    );
    println!("Correlation (Pearson): {}", fmt.opt(cmp.correlation));
    for r in &cmp.rows {
        println!(
            "{}\t{}\t{}\t{}",
            r.country_code,
            r.country_name,
            fmt.num(r.left),
            fmt.num(r.right)
        );
    }
    Ok(())
}

fn cmd_project(accessor: &IndicatorAccessor, args: &ProjectArgs, fmt: &NumFmt) -> Result<()> {
    let response = resolve(accessor, &args.response)?;
    let predictor = resolve(accessor, &args.predictor)?;
    let response_ds = dataset(accessor, response)?;
    let predictor_ds = dataset(accessor, predictor)?;
    let joined = join::join(&response_ds, &predictor_ds);

    let countries = match &args.countries {
        Some(s) => parse_list(s),
        None => joined
            .records
            .iter()
            .map(|r| r.country_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(DEFAULT_PROJECT_COUNTRIES)
            .collect(),
    };
    let (first, last) = projection::default_fit_range(&joined)
        .ok_or_else(|| {
            anyhow!(
                "'{}' and '{}' share no country-years",
                response.name,
                predictor.name
            )
        })?
        .bounds();
    let (start, end) = (args.from.unwrap_or(first), args.to.unwrap_or(last));
    if start > end {
        anyhow::bail!("--from {} is after --to {}", start, end);
    }
    let fit_range = DateSpec::Range { start, end };

    let req = ProjectionRequest {
        countries,
        fit_range,
        target_year: args.target,
        log_response: !args.no_log,
        predictor_scale: predictor.scale,
    };
    let report = projection::project(&joined, &req);

    println!(
        "Fit {} ~ year and {} ~ year + {}{} over {}",
        predictor.value_column,
        response.value_column,
        predictor.value_column,
        if req.log_response { " (ln)" } else { "" },
        fit_range
    );
    println!(
        "country\tR² {p}~year\t{p} {t}\tR² {r}\t{r} {t}",
        p = predictor.value_column,
        r = response.value_column,
        t = report.target_year
    );
    for row in &report.rows {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            row.country_name,
            fmt.opt(row.predictor_r_squared()),
            fmt.num(row.predictor_at_target),
            fmt.opt(row.response_r_squared()),
            fmt.opt(row.response_at_target())
        );
    }
    if report.rows.is_empty() {
        println!(
            "No selected country has enough history to fit (>= {} years).",
            projection::MIN_POINTS
        );
    }
    for ex in &report.excluded {
        eprintln!("excluded {}: {}", ex.country, ex.reason);
    }

    if let Some(path) = &args.out {
        match out_format(path, args.format.as_ref())?.as_str() {
            "csv" => storage::save_projection_csv(&report, path)?,
            _ => storage::save_projection_json(&report, path)?,
        }
        eprintln!("Saved {} projections to {}", report.rows.len(), path.display());
    }

    let codes: Vec<String> = report.rows.iter().map(|r| r.country_code.clone()).collect();
    let history = |ds: &LongDataset| -> Vec<LongRecord> {
        ds.select_years(fit_range)
            .into_records()
            .into_iter()
            .filter(|r| codes.contains(&r.country_code))
            .collect()
    };
    if let Some(path) = &args.plot {
        chart::plot_series(
            &history(&response_ds),
            &chart::response_markers(&report),
            &format!("{}: history and {} projection", response.name, report.target_year),
            &response.value_column,
            path,
            1000,
            600,
        )?;
        eprintln!("Wrote plot to {}", path.display());
    }
    if let Some(path) = &args.plot_predictor {
        chart::plot_series(
            &history(&predictor_ds),
            &chart::predictor_markers(&report),
            &format!("{}: history and {} projection", predictor.name, report.target_year),
            &predictor.value_column,
            path,
            1000,
            600,
        )?;
        eprintln!("Wrote plot to {}", path.display());
    }
    Ok(())
}
