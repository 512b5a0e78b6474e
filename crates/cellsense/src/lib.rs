//! Meta crate that re-exports the cellsense building blocks. Depend on this
//! crate for the common case, or on the layer crates directly when only the
//! grid model is needed.

#[cfg(feature = "common")]
pub use cellsense_common as common;

#[cfg(feature = "resolve")]
pub use cellsense_resolve as resolve;

#[cfg(feature = "common")]
pub use cellsense_common::{CellAddress, CellValue, GridCell, GridSnapshot};

#[cfg(feature = "resolve")]
pub use cellsense_resolve::{
    FormulaDependency, LabelMap, LayoutHint, LayoutPattern, LegendCategory, LegendEntry,
    ResolvedVariable, ResolverConfig, SheetContext, build_label_map, detect_legend,
    parse_formula_dependencies, resolve_cell_to_variable,
};
