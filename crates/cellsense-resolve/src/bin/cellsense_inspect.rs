use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cellsense_resolve::provider::{RuleBasedLayoutProvider, sample_rows};
use cellsense_resolve::{
    CellAddress, CellValue, GridCell, GridSnapshot, ResolverConfig, SheetContext,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cellsense-inspect",
    about = "Inspect what the cells of a spreadsheet grid mean"
)]
struct Cli {
    /// Grid document (JSON). Reads stdin when omitted or `-`.
    #[arg(long, short = 'g')]
    grid: Option<PathBuf>,

    /// Resolver configuration (YAML).
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Infer a layout hint from the grid before resolving.
    #[arg(long)]
    infer_hint: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Label, symbol and value of one cell.
    Resolve {
        reference: String,
        /// Only consider text on the cell's own row.
        #[arg(long)]
        strict: bool,
    },
    /// Resolved dependencies of the formula stored in a cell.
    Deps { reference: String },
    /// Color legend entries.
    Legend,
    /// Label → cell index.
    Labels,
    /// Inferred layout hint.
    Hint,
}

/// `{"origin": "A1", "rows": [["Span", 6.0, "=B1*2"]], "fills": {"B1": "#FFFF00"}}`
///
/// A cell may also be `{"formula": "=B1*2", "value": 12}` to carry a cached value.
#[derive(Debug, Deserialize)]
struct GridDocument {
    #[serde(default = "default_origin")]
    origin: String,
    rows: Vec<Vec<JsonValue>>,
    #[serde(default)]
    fills: BTreeMap<String, String>,
    #[serde(default)]
    sheet: Option<String>,
}

fn default_origin() -> String {
    "A1".to_string()
}

fn json_cell(value: JsonValue) -> Result<GridCell> {
    Ok(match value {
        JsonValue::Null => GridCell::default(),
        JsonValue::Bool(b) => GridCell::from_value(b),
        JsonValue::Number(n) => match n.as_f64() {
            Some(f) => GridCell::from_value(f),
            None => bail!("unrepresentable number {n}"),
        },
        JsonValue::String(s) if s.starts_with('=') && s.len() > 1 => GridCell {
            formula: Some(s),
            ..GridCell::default()
        },
        JsonValue::String(s) => GridCell::from_value(CellValue::from_host_text(&s)),
        JsonValue::Object(mut map) => {
            let formula = map
                .remove("formula")
                .and_then(|f| f.as_str().map(str::to_string));
            let mut cell = match map.remove("value") {
                Some(v) => json_cell(v)?,
                None => GridCell::default(),
            };
            cell.formula = formula;
            cell
        }
        JsonValue::Array(_) => bail!("nested arrays are not valid cells"),
    })
}

impl GridDocument {
    fn into_grid(self) -> Result<(GridSnapshot, String)> {
        let origin = CellAddress::parse(&self.origin)
            .with_context(|| format!("invalid origin {:?}", self.origin))?;
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(json_cell).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        let mut grid = GridSnapshot::new(origin, rows);
        for (reference, color) in &self.fills {
            let address = CellAddress::parse(reference)
                .with_context(|| format!("invalid fill address {reference:?}"))?;
            grid = grid.with_fill(address, color);
        }
        Ok((grid, self.sheet.unwrap_or_else(|| "Sheet1".to_string())))
    }
}

#[derive(Serialize)]
struct LabelRow<'a> {
    label: &'a str,
    cells: Vec<String>,
}

fn read_grid(path: Option<&PathBuf>) -> Result<(GridSnapshot, String)> {
    let text = match path {
        Some(p) if p.as_os_str() != "-" => {
            fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading grid from stdin")?;
            buf
        }
    };
    let doc: GridDocument = serde_json::from_str(&text).context("parsing grid document")?;
    doc.into_grid()
}

fn load_config(path: Option<&PathBuf>) -> Result<ResolverConfig> {
    let Some(path) = path else {
        return Ok(ResolverConfig::default());
    };
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    ResolverConfig::from_yaml_reader(file)
        .with_context(|| format!("loading config {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let (grid, sheet) = read_grid(cli.grid.as_ref())?;
    tracing::info!(sheet = %sheet, rows = grid.height(), cols = grid.width(), "grid loaded");

    let hint = (cli.infer_hint || matches!(cli.command, Command::Hint))
        .then(|| RuleBasedLayoutProvider.infer(&sample_rows(&grid, config.scan.hint_sample_rows)));
    let ctx = SheetContext::new(grid, config).with_hint(hint);

    let out = match &cli.command {
        Command::Resolve { reference, strict } => {
            let address = CellAddress::parse(reference)
                .with_context(|| format!("invalid cell reference {reference:?}"))?;
            serde_json::to_value(ctx.resolve_address(&address, *strict))?
        }
        Command::Deps { reference } => {
            let address = CellAddress::parse(reference)
                .with_context(|| format!("invalid cell reference {reference:?}"))?;
            if ctx.grid().cell(&address).and_then(|c| c.formula.as_ref()).is_none() {
                bail!("{address} holds no formula");
            }
            serde_json::to_value(ctx.dependencies_of(reference))?
        }
        Command::Legend => serde_json::to_value(ctx.legend())?,
        Command::Labels => {
            let rows: Vec<LabelRow<'_>> = ctx
                .label_map()
                .iter()
                .map(|(label, entries)| LabelRow {
                    label,
                    cells: entries.iter().map(|e| e.address.to_string()).collect(),
                })
                .collect();
            serde_json::to_value(rows)?
        }
        Command::Hint => serde_json::to_value(ctx.hint())?,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
