//! Project store schema: one configuration record plus four geometry
//! tables, with child point tables for the two point-based variants.

use rusqlite::Connection;

use crate::error::CelResult;

pub const SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &[
        "CREATE TABLE IF NOT EXISTS setting (\
            id INTEGER PRIMARY KEY CHECK (id = 1),\
            fps INTEGER NOT NULL,\
            current_frame INTEGER NOT NULL,\
            count_of_frames INTEGER NOT NULL,\
            width INTEGER NOT NULL,\
            height INTEGER NOT NULL,\
            timeline_multiplier INTEGER NOT NULL,\
            scale_step INTEGER NOT NULL,\
            stroke_width INTEGER NOT NULL,\
            color TEXT NOT NULL,\
            fill_color TEXT NOT NULL,\
            ghost INTEGER NOT NULL\
        );",
        "CREATE TABLE IF NOT EXISTS pen (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            frame_id INTEGER NOT NULL,\
            stroke_width INTEGER NOT NULL,\
            color TEXT NOT NULL,\
            z_index INTEGER NOT NULL,\
            name TEXT NOT NULL\
        );",
        "CREATE TABLE IF NOT EXISTS pen_point (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            pen_id INTEGER NOT NULL REFERENCES pen(id) ON DELETE CASCADE,\
            x INTEGER NOT NULL,\
            y INTEGER NOT NULL\
        );",
        "CREATE INDEX IF NOT EXISTS idx_pen_frame ON pen(frame_id);",
        "CREATE INDEX IF NOT EXISTS idx_pen_point_owner ON pen_point(pen_id);",
        "CREATE TABLE IF NOT EXISTS line (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            frame_id INTEGER NOT NULL,\
            stroke_width INTEGER NOT NULL,\
            color TEXT NOT NULL,\
            x INTEGER NOT NULL,\
            y INTEGER NOT NULL,\
            xx INTEGER NOT NULL,\
            yy INTEGER NOT NULL,\
            z_index INTEGER NOT NULL,\
            name TEXT NOT NULL\
        );",
        "CREATE INDEX IF NOT EXISTS idx_line_frame ON line(frame_id);",
        "CREATE TABLE IF NOT EXISTS ellipse (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            frame_id INTEGER NOT NULL,\
            stroke_width INTEGER NOT NULL,\
            color TEXT NOT NULL,\
            x INTEGER NOT NULL,\
            y INTEGER NOT NULL,\
            xx INTEGER NOT NULL,\
            yy INTEGER NOT NULL,\
            fill_color TEXT NOT NULL,\
            z_index INTEGER NOT NULL,\
            name TEXT NOT NULL\
        );",
        "CREATE INDEX IF NOT EXISTS idx_ellipse_frame ON ellipse(frame_id);",
        "CREATE TABLE IF NOT EXISTS filler (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            frame_id INTEGER NOT NULL,\
            color TEXT NOT NULL,\
            z_index INTEGER NOT NULL,\
            name TEXT NOT NULL\
        );",
        "CREATE TABLE IF NOT EXISTS filler_point (\
            id INTEGER PRIMARY KEY AUTOINCREMENT,\
            filler_id INTEGER NOT NULL REFERENCES filler(id) ON DELETE CASCADE,\
            x INTEGER NOT NULL,\
            y INTEGER NOT NULL\
        );",
        "CREATE INDEX IF NOT EXISTS idx_filler_frame ON filler(frame_id);",
        "CREATE INDEX IF NOT EXISTS idx_filler_point_owner ON filler_point(filler_id);",
    ],
}];

/// Bring a connection up to the current schema version.
pub fn bootstrap(conn: &Connection) -> CelResult<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        log::debug!("applying schema migration {}", migration.version);
        let tx = conn.unchecked_transaction()?;
        for statement in migration.statements {
            tx.execute_batch(statement)?;
        }
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration.version))?;
        tx.commit()?;
    }
    Ok(())
}

/// Insert the default settings row for a freshly created project:
/// 16 fps, frame 1 of 1, 1920x1080, 100% timeline, 40px wheel step,
/// stroke width 4, opaque black stroke, transparent fill, ghost on.
pub fn populate(conn: &Connection) -> CelResult<()> {
    conn.execute(
        "INSERT INTO setting (id, fps, current_frame, count_of_frames, width, height, \
         timeline_multiplier, scale_step, stroke_width, color, fill_color, ghost) \
         VALUES (1, 16, 1, 1, 1920, 1080, 100, 40, 4, '0|0|0|255', '0|0|0|0', 1)",
        [],
    )?;
    Ok(())
}

pub fn current_version(conn: &Connection) -> CelResult<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
