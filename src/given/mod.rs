//! Boundary pressures for a site deck from an existing regional run, when
//! neither deck was generated by this crate.
//!
//! The site outline is read from the site case, each outline face is matched
//! to the regional grid by proximity and border crossing, and regional
//! pressures are interpolated onto the faces at every regional report step.
//! The result is a copy of the site deck with `BCCON`/`BCPROP` boundary
//! conditions:
//!
//! ```text
//! <output>/EXPRECCS.DATA
//! <output>/BCCON.INC
//! <output>/bc/BCPROP1.INC ... BCPROPm.INC
//! <output>/*.INC            (copied from the site deck folder)
//! <regional folder>/FIPNUM.INC
//! ```

mod borders;
mod projection;

use std::path::{Path, PathBuf};

pub use borders::{Handedness, fipnum, fipnum_tags, ij_orientation, site_border_faces};
pub use projection::GivenProjection;

use crate::error::{Error, Result};
use crate::io::{
    BcpropKind, DeckRewriter, EclArchive, RestartLayout, SimulationArchive, write_bccon_file,
    write_bcprop_file, write_int_include,
};
use crate::time::{
    PerStep, SECONDS_PER_DAY, Schedule, TimeInterpolation, report_series, resample,
};
use crate::types::LiquidPhase;

/// Settings of a given-deck projection.
#[derive(Clone, Debug, PartialEq)]
pub struct GivenOptions {
    /// Restrict correspondences to equal region tags.
    pub zones: bool,
    /// `INIT` keyword holding the region tags.
    pub zone_keyword: String,
    /// Transfer pressure changes onto the site's initial pressure instead of
    /// absolute values.
    pub incremental: bool,
    /// Site sub-steps per regional report interval; without it the site
    /// deck's own `TSTEP` schedule is used.
    pub frequency: Option<PerStep<usize>>,
    /// Telescoping coefficient of the sub-steps.
    pub telescoping: PerStep<f64>,
    /// Temporal interpolation onto the site schedule.
    pub time_interp: TimeInterpolation,
    /// Phase whose density corrects fallback pressures.
    pub phase: LiquidPhase,
}

impl Default for GivenOptions {
    fn default() -> Self {
        Self {
            zones: false,
            zone_keyword: "OPERNUM".to_string(),
            incremental: false,
            frequency: None,
            telescoping: PerStep::Scalar(0.0),
            time_interp: TimeInterpolation::Interp,
            phase: LiquidPhase::Water,
        }
    }
}

/// What a given-deck projection produced.
#[derive(Clone, Debug, PartialEq)]
pub struct GivenSummary {
    /// Faces with a `BCCON` row.
    pub faces: usize,
    /// `BCPROP` files written.
    pub steps: usize,
    /// The rewritten deck.
    pub deck: PathBuf,
}

/// Site report schedule for the rewritten deck.
pub fn target_schedule(source: &Schedule, deck: &DeckRewriter, options: &GivenOptions) -> Result<Schedule> {
    match &options.frequency {
        Some(frequency) => Ok(source.refine(frequency, &options.telescoping)?),
        None => {
            let steps: Vec<f64> = deck
                .tstep_days()?
                .into_iter()
                .map(|d| d * SECONDS_PER_DAY)
                .collect();
            Ok(Schedule::from_steps(&steps)?)
        }
    }
}

fn case_dir(case: &Path) -> &Path {
    case.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn copy_includes(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    let entries = std::fs::read_dir(from).map_err(|e| Error::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(from, e))?;
        let path = entry.path();
        let is_include = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("inc"));
        if !is_include || !path.is_file() {
            continue;
        }
        let target = to.join(entry.file_name());
        std::fs::copy(&path, &target).map_err(|e| Error::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}

/// Build a site deck with projected boundary pressures.
///
/// `regional_case` and `site_case` are case paths without extension (for
/// example `runs/regional/REGIONAL`); both must have finished runs. The site
/// deck is `<site_case>.DATA`.
pub fn project_given_decks(
    regional_case: &Path,
    site_case: &Path,
    output: &Path,
    layout: RestartLayout,
    options: &GivenOptions,
) -> Result<GivenSummary> {
    let regional = EclArchive::open(regional_case, layout)?;
    let site = EclArchive::open(site_case, layout)?;
    let projection = GivenProjection::build(&regional, &site, options)?;

    let fipnum_path = case_dir(regional_case).join("FIPNUM.INC");
    write_int_include(&fipnum_path, "FIPNUM", projection.fipnum())?;

    let series = projection.pressure_series(&regional)?;
    let (source, values) = report_series(regional.report_times(), series)?;
    let mut deck = DeckRewriter::from_file(&site_case.with_extension("DATA"))?;
    let target = target_schedule(&source, &deck, options)?;
    let resampled = resample(&source, &values, &target, options.time_interp);

    std::fs::create_dir_all(output).map_err(|e| Error::io(output, e))?;
    let copied = copy_includes(case_dir(site_case), output)?;
    let ids = projection.face_ids();
    let component = options.phase.keywords().component();
    for (n, values) in resampled.iter().enumerate().skip(1) {
        let path = output.join("bc").join(format!("BCPROP{n}.INC"));
        let rows = write_bcprop_file(&path, BcpropKind::Dirichlet, component, &ids, values)?;
        if rows < ids.len() {
            tracing::warn!(step = n, missing = ids.len() - rows, "faces without pressure");
        }
    }
    write_bccon_file(&output.join("BCCON.INC"), &projection.bccon_rows())?;

    deck.include_after("GRID", &["BCCON.INC"]);
    deck.replace_tsteps(&target, "bc")?;
    let deck_path = output.join("EXPRECCS.DATA");
    deck.write(&deck_path)?;
    tracing::info!(
        faces = projection.n_faces(),
        steps = target.n_steps(),
        includes = copied,
        deck = %deck_path.display(),
        "given-deck projection written"
    );
    Ok(GivenSummary {
        faces: projection.n_faces(),
        steps: target.n_steps(),
        deck: deck_path,
    })
}
