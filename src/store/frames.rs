//! Whole-frame sequencing: duplicating a frame into the timeline and
//! deleting one, with the tail of the timeline shifted to match.
//!
//! Both operations are transactional: the row shifts, copies and the
//! frame-count update commit together or not at all.

use rusqlite::{params, Transaction};

use crate::error::CelResult;
use crate::model::Variant;

pub struct FrameManager<'c> {
    conn: &'c rusqlite::Connection,
}

impl<'c> FrameManager<'c> {
    pub(crate) fn new(conn: &'c rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Copy every object of `source_frame` into a new frame slot directly
    /// after `insert_after`.
    ///
    /// The tail (every frame above `insert_after`) shifts right first to
    /// open the gap. A source frame that itself lies after the insertion
    /// point has therefore just moved, and is re-addressed at
    /// `source_frame + 1` before copying. This asymmetry is long-standing
    /// behavior; keep it.
    pub fn duplicate(&self, source_frame: i64, insert_after: i64) -> CelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for variant in Variant::ALL {
            tx.execute(
                &format!(
                    "UPDATE {} SET frame_id = frame_id + 1 WHERE frame_id > ?1",
                    variant.table()
                ),
                [insert_after],
            )?;
        }
        let source = if insert_after < source_frame {
            source_frame + 1
        } else {
            source_frame
        };
        let target = insert_after + 1;
        copy_frame_objects(&tx, source, target)?;
        tx.execute(
            "UPDATE setting SET count_of_frames = count_of_frames + 1",
            [],
        )?;
        tx.commit()?;
        log::debug!("duplicated frame {source_frame} into slot {target}");
        Ok(())
    }

    /// Delete every object of `frame_index` (cascading points) and close
    /// the gap. A project always retains at least one frame: the count is
    /// only decremented while it is above 1.
    pub fn delete(&self, frame_index: i64) -> CelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let count: i64 =
            tx.query_row("SELECT count_of_frames FROM setting WHERE id = 1", [], |row| {
                row.get(0)
            })?;
        if count > 1 {
            tx.execute(
                "UPDATE setting SET count_of_frames = count_of_frames - 1",
                [],
            )?;
        }
        for variant in Variant::ALL {
            let table = variant.table();
            if variant.has_points() {
                tx.execute(
                    &format!(
                        "DELETE FROM {table}_point WHERE {table}_id IN \
                         (SELECT id FROM {table} WHERE frame_id = ?1)"
                    ),
                    [frame_index],
                )?;
            }
            tx.execute(
                &format!("DELETE FROM {table} WHERE frame_id = ?1"),
                [frame_index],
            )?;
            tx.execute(
                &format!(
                    "UPDATE {table} SET frame_id = frame_id - 1 WHERE frame_id > ?1"
                ),
                [frame_index],
            )?;
        }
        // Keep the active frame inside the shortened timeline.
        tx.execute(
            "UPDATE setting SET current_frame = count_of_frames \
             WHERE current_frame > count_of_frames",
            [],
        )?;
        tx.commit()?;
        log::debug!("deleted frame {frame_index}");
        Ok(())
    }
}

/// Copy every object (and owned points) at `source` into `target`.
fn copy_frame_objects(tx: &Transaction<'_>, source: i64, target: i64) -> CelResult<()> {
    tx.execute(
        "INSERT INTO ellipse \
         (frame_id, stroke_width, color, x, y, xx, yy, fill_color, z_index, name) \
         SELECT ?1, stroke_width, color, x, y, xx, yy, fill_color, z_index, name \
         FROM ellipse WHERE frame_id = ?2",
        params![target, source],
    )?;
    tx.execute(
        "INSERT INTO line (frame_id, stroke_width, color, x, y, xx, yy, z_index, name) \
         SELECT ?1, stroke_width, color, x, y, xx, yy, z_index, name \
         FROM line WHERE frame_id = ?2",
        params![target, source],
    )?;
    // Point owners are copied one at a time so each fresh row id can adopt
    // its source's point list.
    let pen_rows: Vec<i64> = collect_ids(tx, "pen", source)?;
    for row in pen_rows {
        tx.execute(
            "INSERT INTO pen (frame_id, stroke_width, color, z_index, name) \
             SELECT ?1, stroke_width, color, z_index, name FROM pen WHERE id = ?2",
            params![target, row],
        )?;
        let copy = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO pen_point (pen_id, x, y) \
             SELECT ?1, x, y FROM pen_point WHERE pen_id = ?2 ORDER BY id",
            params![copy, row],
        )?;
    }
    let filler_rows: Vec<i64> = collect_ids(tx, "filler", source)?;
    for row in filler_rows {
        tx.execute(
            "INSERT INTO filler (frame_id, color, z_index, name) \
             SELECT ?1, color, z_index, name FROM filler WHERE id = ?2",
            params![target, row],
        )?;
        let copy = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO filler_point (filler_id, x, y) \
             SELECT ?1, x, y FROM filler_point WHERE filler_id = ?2 ORDER BY id",
            params![copy, row],
        )?;
    }
    Ok(())
}

fn collect_ids(tx: &Transaction<'_>, table: &str, frame: i64) -> CelResult<Vec<i64>> {
    let mut statement =
        tx.prepare(&format!("SELECT id FROM {table} WHERE frame_id = ?1 ORDER BY id"))?;
    let ids = statement
        .query_map([frame], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use crate::model::{DrawableObject, Point, Shape, Variant};
    use crate::store::settings::{Dialog, SettingsPatch};
    use crate::store::ProjectDb;

    /// Object sets compared ids-aside.
    fn fingerprint(objects: Vec<DrawableObject>) -> Vec<(i64, i64, String, Shape)> {
        objects
            .into_iter()
            .map(|object| (object.frame, object.z_index, object.name, object.shape))
            .collect()
    }

    fn project_with_three_frames() -> ProjectDb {
        let db = ProjectDb::open_in_memory().unwrap();
        let defaults = db.settings().load().unwrap();
        db.settings()
            .update(SettingsPatch {
                current_frame: Dialog::Accepted(3),
                ..SettingsPatch::default()
            })
            .unwrap();
        let objects = db.objects();
        for frame in 1..=3 {
            let pen = objects
                .create(Variant::Pen, frame, Point::new(0, 0), &defaults)
                .unwrap();
            objects
                .append_point(pen, Point::new(frame * 10, frame * 20))
                .unwrap();
            let line = objects
                .create(Variant::Line, frame, Point::new(frame, frame), &defaults)
                .unwrap();
            objects
                .set_endpoint(line, Point::new(frame * 100, frame * 100))
                .unwrap();
        }
        db
    }

    #[test]
    fn test_duplicate_then_delete_restores_timeline() {
        let db = project_with_three_frames();
        let before: Vec<_> = (1..=3)
            .map(|frame| fingerprint(db.objects().list_for_frame(frame).unwrap()))
            .collect();

        db.frames().duplicate(2, 1).unwrap();
        assert_eq!(db.settings().load().unwrap().count_of_frames, 4);
        db.frames().delete(2).unwrap();
        assert_eq!(db.settings().load().unwrap().count_of_frames, 3);

        let after: Vec<_> = (1..=3)
            .map(|frame| fingerprint(db.objects().list_for_frame(frame).unwrap()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_copies_source_content_and_points() {
        let db = project_with_three_frames();
        db.frames().duplicate(3, 3).unwrap();
        let copy = fingerprint(db.objects().list_for_frame(4).unwrap());
        let mut source = fingerprint(db.objects().list_for_frame(3).unwrap());
        for entry in &mut source {
            entry.0 = 4;
        }
        assert_eq!(copy, source);
    }

    #[test]
    fn test_duplicate_source_after_insertion_point_readdresses() {
        // Duplicating frame 3 after frame 1: the tail shift moves the old
        // frame 3 to slot 4, and that is what lands in slot 2.
        let db = project_with_three_frames();
        let relabel = |mut entries: Vec<(i64, i64, String, Shape)>, frame: i64| {
            for entry in &mut entries {
                entry.0 = frame;
            }
            entries
        };
        let original_two = fingerprint(db.objects().list_for_frame(2).unwrap());
        let original_three = fingerprint(db.objects().list_for_frame(3).unwrap());

        db.frames().duplicate(3, 1).unwrap();
        assert_eq!(db.settings().load().unwrap().count_of_frames, 4);
        // Slot 2 received the duplicate of the old frame 3.
        assert_eq!(
            fingerprint(db.objects().list_for_frame(2).unwrap()),
            relabel(original_three.clone(), 2)
        );
        // The old frames 2 and 3 shifted right to 3 and 4.
        assert_eq!(
            fingerprint(db.objects().list_for_frame(3).unwrap()),
            relabel(original_two, 3)
        );
        assert_eq!(
            fingerprint(db.objects().list_for_frame(4).unwrap()),
            relabel(original_three, 4)
        );
    }

    #[test]
    fn test_delete_never_drops_below_one_frame() {
        let db = ProjectDb::open_in_memory().unwrap();
        let defaults = db.settings().load().unwrap();
        let pen = db
            .objects()
            .create(Variant::Pen, 1, Point::new(0, 0), &defaults)
            .unwrap();
        db.objects().append_point(pen, Point::new(1, 1)).unwrap();

        db.frames().delete(1).unwrap();
        let settings = db.settings().load().unwrap();
        assert_eq!(settings.count_of_frames, 1);
        assert_eq!(settings.current_frame, 1);
        // The frame itself was emptied even though the count held.
        assert!(db.objects().list_for_frame(1).unwrap().is_empty());
        let orphans: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM pen_point", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_delete_clamps_current_frame() {
        let db = project_with_three_frames();
        assert_eq!(db.settings().load().unwrap().current_frame, 3);
        db.frames().delete(3).unwrap();
        let settings = db.settings().load().unwrap();
        assert_eq!(settings.count_of_frames, 2);
        assert_eq!(settings.current_frame, 2);
    }
}
