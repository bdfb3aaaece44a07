//! The persisted project configuration singleton.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{CelError, CelResult};
use crate::model::Color;

/// The single persisted configuration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub fps: i64,
    /// 1-based index of the active frame; never exceeds `count_of_frames`.
    pub current_frame: i64,
    pub count_of_frames: i64,
    /// Canvas-native resolution in pixels.
    pub width: i64,
    pub height: i64,
    /// Timeline zoom percentage.
    pub timeline_multiplier: i64,
    /// Pixels added or removed per wheel-zoom tick.
    pub scale_step: i64,
    pub stroke_width: i64,
    pub color: Color,
    pub fill_color: Color,
    pub ghost: bool,
}

/// Outcome of a cancelable input dialog. A canceled field is skipped by
/// `SettingsStore::update` without failing the rest of the patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialog<T> {
    #[default]
    Unset,
    Canceled,
    Accepted(T),
}

impl<T> Dialog<T> {
    fn value(self) -> Option<T> {
        match self {
            Dialog::Accepted(value) => Some(value),
            Dialog::Unset | Dialog::Canceled => None,
        }
    }
}

/// Partial settings update; unset fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub fps: Dialog<i64>,
    pub current_frame: Dialog<i64>,
    pub count_of_frames: Dialog<i64>,
    pub width: Dialog<i64>,
    pub height: Dialog<i64>,
    pub timeline_multiplier: Dialog<i64>,
    pub scale_step: Dialog<i64>,
    pub stroke_width: Dialog<i64>,
    pub color: Dialog<Color>,
    pub fill_color: Dialog<Color>,
    pub ghost: Dialog<bool>,
}

impl SettingsPatch {
    pub fn current_frame(frame: i64) -> Self {
        Self {
            current_frame: Dialog::Accepted(frame),
            ..Self::default()
        }
    }
}

pub struct SettingsStore<'c> {
    conn: &'c Connection,
}

impl<'c> SettingsStore<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Load the configuration row; a project file without one is corrupt.
    pub fn load(&self) -> CelResult<Settings> {
        let settings = self.conn.query_row(
            "SELECT fps, current_frame, count_of_frames, width, height, \
             timeline_multiplier, scale_step, stroke_width, color, fill_color, ghost \
             FROM setting WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, i64>(10)?,
                ))
            },
        )?;
        let (
            fps,
            current_frame,
            count_of_frames,
            width,
            height,
            timeline_multiplier,
            scale_step,
            stroke_width,
            color,
            fill_color,
            ghost,
        ) = settings;
        Ok(Settings {
            fps,
            current_frame,
            count_of_frames,
            width,
            height,
            timeline_multiplier,
            scale_step,
            stroke_width,
            color: color.parse()?,
            fill_color: fill_color.parse()?,
            ghost: ghost != 0,
        })
    }

    /// Apply every accepted field of the patch in one transaction, then
    /// reload. Raising `current_frame` above `count_of_frames` raises the
    /// count to match in the same transaction.
    pub fn update(&self, patch: SettingsPatch) -> CelResult<Settings> {
        validate(&patch)?;
        let tx = self.conn.unchecked_transaction()?;
        let mut apply = |column: &str, value: i64| -> CelResult<()> {
            tx.execute(&format!("UPDATE setting SET {column} = ?1"), [value])?;
            Ok(())
        };
        if let Some(fps) = patch.fps.value() {
            apply("fps", fps)?;
        }
        if let Some(count) = patch.count_of_frames.value() {
            apply("count_of_frames", count)?;
        }
        if let Some(width) = patch.width.value() {
            apply("width", width)?;
        }
        if let Some(height) = patch.height.value() {
            apply("height", height)?;
        }
        if let Some(multiplier) = patch.timeline_multiplier.value() {
            apply("timeline_multiplier", multiplier)?;
        }
        if let Some(step) = patch.scale_step.value() {
            apply("scale_step", step)?;
        }
        if let Some(stroke) = patch.stroke_width.value() {
            apply("stroke_width", stroke)?;
        }
        if let Some(frame) = patch.current_frame.value() {
            apply("current_frame", frame)?;
            let count: i64 =
                tx.query_row("SELECT count_of_frames FROM setting WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            // Stepping past the last frame appends new empty frames.
            if frame > count {
                apply("count_of_frames", frame)?;
            }
        }
        if let Some(color) = patch.color.value() {
            tx.execute("UPDATE setting SET color = ?1", [color.to_string()])?;
        }
        if let Some(fill) = patch.fill_color.value() {
            tx.execute("UPDATE setting SET fill_color = ?1", [fill.to_string()])?;
        }
        if let Some(ghost) = patch.ghost.value() {
            apply("ghost", i64::from(ghost))?;
        }
        tx.commit()?;
        self.load()
    }
}

/// Range checks for the numeric fields; rejected patches never reach
/// the store.
fn validate(patch: &SettingsPatch) -> CelResult<()> {
    let check = |name: &str, value: Dialog<i64>, low: i64, high: i64| -> CelResult<()> {
        if let Dialog::Accepted(value) = value {
            if value < low || value > high {
                return Err(CelError::validation(format!(
                    "{name} must be between {low} and {high}, got {value}"
                )));
            }
        }
        Ok(())
    };
    check("fps", patch.fps, 1, 144)?;
    check("current_frame", patch.current_frame, 1, i64::MAX)?;
    check("count_of_frames", patch.count_of_frames, 1, i64::MAX)?;
    check("width", patch.width, 100, 16384)?;
    check("height", patch.height, 100, 16384)?;
    check("timeline_multiplier", patch.timeline_multiplier, 1, 1000)?;
    check("scale_step", patch.scale_step, 1, 500)?;
    check("stroke_width", patch.stroke_width, 1, 500)?;
    Ok(())
}
