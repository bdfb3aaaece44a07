//! CRUD over the four drawable-object variants and their point lists.
//!
//! Rows keep the historical per-variant table layout; every read is folded
//! into the tagged [`Shape`] union at this boundary and no caller ever
//! re-derives a variant from column shapes.

use rusqlite::{params, Connection, Row};

use crate::error::{CelError, CelResult};
use crate::model::{Color, DrawableObject, ObjectId, Point, Shape, Variant};
use crate::store::settings::Settings;

pub struct ObjectStore<'c> {
    conn: &'c Connection,
}

impl<'c> ObjectStore<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a new object on `frame` using the project defaults; z-index
    /// starts at 0. For segment/ellipse variants both endpoints start at
    /// `at` (the press position); point variants start empty and `at` is
    /// not recorded until the caller appends it.
    ///
    /// The returned handle is what the caller holds for the duration of
    /// the drag gesture.
    pub fn create(
        &self,
        variant: Variant,
        frame: i64,
        at: Point,
        defaults: &Settings,
    ) -> CelResult<ObjectId> {
        let name = variant.default_name();
        match variant {
            Variant::Pen => {
                self.conn.execute(
                    "INSERT INTO pen (frame_id, stroke_width, color, z_index, name) \
                     VALUES (?1, ?2, ?3, 0, ?4)",
                    params![frame, defaults.stroke_width, defaults.color.to_string(), name],
                )?;
            }
            Variant::Line => {
                self.conn.execute(
                    "INSERT INTO line (frame_id, stroke_width, color, x, y, xx, yy, z_index, name) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5, 0, ?6)",
                    params![
                        frame,
                        defaults.stroke_width,
                        defaults.color.to_string(),
                        at.x,
                        at.y,
                        name
                    ],
                )?;
            }
            Variant::Ellipse => {
                self.conn.execute(
                    "INSERT INTO ellipse \
                     (frame_id, stroke_width, color, x, y, xx, yy, fill_color, z_index, name) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5, ?6, 0, ?7)",
                    params![
                        frame,
                        defaults.stroke_width,
                        defaults.color.to_string(),
                        at.x,
                        at.y,
                        defaults.fill_color.to_string(),
                        name
                    ],
                )?;
            }
            Variant::Filler => {
                // A fresh polygon fills with the default stroke color, not
                // the default fill color; the latter starts transparent and
                // would make new fillers invisible.
                self.conn.execute(
                    "INSERT INTO filler (frame_id, color, z_index, name) VALUES (?1, ?2, 0, ?3)",
                    params![frame, defaults.color.to_string(), name],
                )?;
            }
        }
        let id = ObjectId::new(variant, self.conn.last_insert_rowid());
        log::debug!("created {id} on frame {frame}");
        Ok(id)
    }

    /// Append a point in canvas-native coordinates. Valid only for the
    /// point-list variants.
    pub fn append_point(&self, id: ObjectId, point: Point) -> CelResult<()> {
        if !id.variant.has_points() {
            return Err(CelError::validation(format!(
                "{} objects have no point list",
                id.variant
            )));
        }
        self.require(id)?;
        let table = id.variant.table();
        self.conn.execute(
            &format!("INSERT INTO {table}_point ({table}_id, x, y) VALUES (?1, ?2, ?3)"),
            params![id.row, point.x, point.y],
        )?;
        Ok(())
    }

    /// Overwrite the second corner/endpoint of an in-progress segment or
    /// ellipse while it is being dragged into shape.
    pub fn set_endpoint(&self, id: ObjectId, point: Point) -> CelResult<()> {
        match id.variant {
            Variant::Line | Variant::Ellipse => {}
            Variant::Pen | Variant::Filler => {
                return Err(CelError::validation(format!(
                    "{} objects have no draggable endpoint",
                    id.variant
                )));
            }
        }
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET xx = ?1, yy = ?2 WHERE id = ?3",
                id.variant.table()
            ),
            params![point.x, point.y, id.row],
        )?;
        if changed == 0 {
            return Err(CelError::NotFound { id });
        }
        Ok(())
    }

    /// Variant-aware partial property update; fields that do not apply to
    /// the variant are ignored.
    pub fn set_properties(
        &self,
        id: ObjectId,
        name: &str,
        stroke_width: Option<i64>,
        stroke_color: Option<Color>,
        fill_color: Option<Color>,
    ) -> CelResult<()> {
        self.require(id)?;
        let table = id.variant.table();
        self.conn.execute(
            &format!("UPDATE {table} SET name = ?1 WHERE id = ?2"),
            params![name, id.row],
        )?;
        if matches!(id.variant, Variant::Pen | Variant::Line | Variant::Ellipse) {
            if let Some(width) = stroke_width {
                self.conn.execute(
                    &format!("UPDATE {table} SET stroke_width = ?1 WHERE id = ?2"),
                    params![width, id.row],
                )?;
            }
            if let Some(color) = stroke_color {
                self.conn.execute(
                    &format!("UPDATE {table} SET color = ?1 WHERE id = ?2"),
                    params![color.to_string(), id.row],
                )?;
            }
        }
        match id.variant {
            Variant::Ellipse => {
                if let Some(fill) = fill_color {
                    self.conn.execute(
                        "UPDATE ellipse SET fill_color = ?1 WHERE id = ?2",
                        params![fill.to_string(), id.row],
                    )?;
                }
            }
            Variant::Filler => {
                if let Some(fill) = fill_color {
                    self.conn.execute(
                        "UPDATE filler SET color = ?1 WHERE id = ?2",
                        params![fill.to_string(), id.row],
                    )?;
                }
            }
            Variant::Pen | Variant::Line => {}
        }
        Ok(())
    }

    /// Delete the object and, for point-list variants, every owned point.
    pub fn delete(&self, id: ObjectId) -> CelResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let table = id.variant.table();
        if id.variant.has_points() {
            tx.execute(
                &format!("DELETE FROM {table}_point WHERE {table}_id = ?1"),
                [id.row],
            )?;
        }
        let changed = tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id.row])?;
        if changed == 0 {
            return Err(CelError::NotFound { id });
        }
        tx.commit()?;
        log::debug!("deleted {id}");
        Ok(())
    }

    /// Translate every coordinate owned by the object by (dx, dy).
    pub fn reposition(&self, id: ObjectId, dx: i64, dy: i64) -> CelResult<()> {
        self.require(id)?;
        let table = id.variant.table();
        if id.variant.has_points() {
            self.conn.execute(
                &format!(
                    "UPDATE {table}_point SET x = x + ?1, y = y + ?2 WHERE {table}_id = ?3"
                ),
                params![dx, dy, id.row],
            )?;
        } else {
            self.conn.execute(
                &format!(
                    "UPDATE {table} SET x = x + ?1, y = y + ?2, xx = xx + ?1, yy = yy + ?2 \
                     WHERE id = ?3"
                ),
                params![dx, dy, id.row],
            )?;
        }
        Ok(())
    }

    /// Additive paint-order adjustment; indices are never renormalized.
    pub fn change_z_index(&self, id: ObjectId, delta: i64) -> CelResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET z_index = z_index + ?1 WHERE id = ?2",
                id.variant.table()
            ),
            params![delta, id.row],
        )?;
        if changed == 0 {
            return Err(CelError::NotFound { id });
        }
        Ok(())
    }

    /// Every object of one frame, all four variants merged, sorted by
    /// z-index ascending. Row ids are per-variant tables and can collide
    /// across variants, so ties break by row id first and then by variant
    /// order (pen, line, ellipse, filler).
    pub fn list_for_frame(&self, frame: i64) -> CelResult<Vec<DrawableObject>> {
        let mut objects = Vec::new();
        for variant in Variant::ALL {
            self.collect_variant(variant, frame, &mut objects)?;
        }
        objects.sort_by_key(|object| (object.z_index, object.id.row, object.id.variant as u8));
        Ok(objects)
    }

    /// Ordered point list of a pen or filler object.
    pub fn points_of(&self, id: ObjectId) -> CelResult<Vec<Point>> {
        if !id.variant.has_points() {
            return Err(CelError::validation(format!(
                "{} objects have no point list",
                id.variant
            )));
        }
        self.require(id)?;
        let table = id.variant.table();
        let mut statement = self.conn.prepare(&format!(
            "SELECT x, y FROM {table}_point WHERE {table}_id = ?1 ORDER BY id"
        ))?;
        let points = statement
            .query_map([id.row], |row| {
                Ok(Point::new(row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }

    fn collect_variant(
        &self,
        variant: Variant,
        frame: i64,
        out: &mut Vec<DrawableObject>,
    ) -> CelResult<()> {
        let sql = match variant {
            Variant::Pen => {
                "SELECT id, frame_id, z_index, name, stroke_width, color \
                 FROM pen WHERE frame_id = ?1"
            }
            Variant::Line => {
                "SELECT id, frame_id, z_index, name, stroke_width, color, x, y, xx, yy \
                 FROM line WHERE frame_id = ?1"
            }
            Variant::Ellipse => {
                "SELECT id, frame_id, z_index, name, stroke_width, color, x, y, xx, yy, \
                 fill_color FROM ellipse WHERE frame_id = ?1"
            }
            Variant::Filler => {
                "SELECT id, frame_id, z_index, name, color FROM filler WHERE frame_id = ?1"
            }
        };
        let mut statement = self.conn.prepare(sql)?;
        let mut rows = statement.query([frame])?;
        while let Some(row) = rows.next()? {
            out.push(self.fold_row(variant, row)?);
        }
        Ok(())
    }

    /// Fold one geometry row (plus child points where owned) into the
    /// uniform tagged record.
    fn fold_row(&self, variant: Variant, row: &Row<'_>) -> CelResult<DrawableObject> {
        let id = ObjectId::new(variant, row.get(0)?);
        let frame: i64 = row.get(1)?;
        let z_index: i64 = row.get(2)?;
        let name: String = row.get(3)?;
        let shape = match variant {
            Variant::Pen => Shape::Pen {
                stroke_width: row.get(4)?,
                color: row.get::<_, String>(5)?.parse()?,
                points: self.points_of(id)?,
            },
            Variant::Line => Shape::Line {
                stroke_width: row.get(4)?,
                color: row.get::<_, String>(5)?.parse()?,
                start: Point::new(row.get(6)?, row.get(7)?),
                end: Point::new(row.get(8)?, row.get(9)?),
            },
            Variant::Ellipse => Shape::Ellipse {
                stroke_width: row.get(4)?,
                color: row.get::<_, String>(5)?.parse()?,
                corner_a: Point::new(row.get(6)?, row.get(7)?),
                corner_b: Point::new(row.get(8)?, row.get(9)?),
                fill_color: row.get::<_, String>(10)?.parse()?,
            },
            Variant::Filler => Shape::Filler {
                fill_color: row.get::<_, String>(4)?.parse()?,
                points: self.points_of(id)?,
            },
        };
        Ok(DrawableObject {
            id,
            frame,
            z_index,
            name,
            shape,
        })
    }

    fn require(&self, id: ObjectId) -> CelResult<()> {
        let exists: bool = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", id.variant.table()),
            [id.row],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(CelError::NotFound { id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectDb;

    fn store_with_defaults() -> ProjectDb {
        ProjectDb::open_in_memory().unwrap()
    }

    #[test]
    fn test_append_points_preserve_insertion_order() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        let id = objects
            .create(Variant::Pen, 1, Point::new(0, 0), &defaults)
            .unwrap();
        let trail = [
            Point::new(5, 5),
            Point::new(3, 9),
            Point::new(3, 9),
            Point::new(-2, 40),
        ];
        for point in trail {
            objects.append_point(id, point).unwrap();
        }
        assert_eq!(objects.points_of(id).unwrap(), trail);
    }

    #[test]
    fn test_append_point_rejected_for_line() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let id = db
            .objects()
            .create(Variant::Line, 1, Point::new(1, 1), &defaults)
            .unwrap();
        assert!(matches!(
            db.objects().append_point(id, Point::new(2, 2)),
            Err(CelError::Validation(_))
        ));
    }

    #[test]
    fn test_line_created_with_equal_endpoints_then_dragged() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        let id = objects
            .create(Variant::Line, 1, Point::new(10, 20), &defaults)
            .unwrap();
        let listed = objects.list_for_frame(1).unwrap();
        assert_eq!(
            listed[0].shape,
            Shape::Line {
                stroke_width: defaults.stroke_width,
                color: defaults.color,
                start: Point::new(10, 20),
                end: Point::new(10, 20),
            }
        );
        objects.set_endpoint(id, Point::new(300, 400)).unwrap();
        objects.set_endpoint(id, Point::new(350, 420)).unwrap();
        let listed = objects.list_for_frame(1).unwrap();
        match &listed[0].shape {
            Shape::Line { start, end, .. } => {
                assert_eq!(*start, Point::new(10, 20));
                assert_eq!(*end, Point::new(350, 420));
            }
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn test_set_endpoint_missing_row_is_not_found() {
        let db = store_with_defaults();
        let id = ObjectId::new(Variant::Ellipse, 99);
        assert!(matches!(
            db.objects().set_endpoint(id, Point::new(0, 0)),
            Err(CelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reposition_roundtrip_restores_coordinates() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();

        let pen = objects
            .create(Variant::Pen, 1, Point::new(0, 0), &defaults)
            .unwrap();
        objects.append_point(pen, Point::new(7, 11)).unwrap();
        objects.append_point(pen, Point::new(13, 17)).unwrap();
        let ellipse = objects
            .create(Variant::Ellipse, 1, Point::new(100, 200), &defaults)
            .unwrap();
        objects.set_endpoint(ellipse, Point::new(180, 260)).unwrap();

        let before = objects.list_for_frame(1).unwrap();
        objects.reposition(pen, 31, -8).unwrap();
        objects.reposition(ellipse, 31, -8).unwrap();
        objects.reposition(pen, -31, 8).unwrap();
        objects.reposition(ellipse, -31, 8).unwrap();
        assert_eq!(objects.list_for_frame(1).unwrap(), before);
    }

    #[test]
    fn test_z_order_sorts_listing_with_id_tiebreak() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        let first = objects
            .create(Variant::Line, 1, Point::new(0, 0), &defaults)
            .unwrap();
        let second = objects
            .create(Variant::Line, 1, Point::new(1, 1), &defaults)
            .unwrap();
        let third = objects
            .create(Variant::Filler, 1, Point::new(2, 2), &defaults)
            .unwrap();

        objects.change_z_index(first, 2).unwrap();
        objects.change_z_index(third, 1).unwrap();
        let order: Vec<ObjectId> = objects
            .list_for_frame(1)
            .unwrap()
            .into_iter()
            .map(|object| object.id)
            .collect();
        assert_eq!(order, vec![second, third, first]);

        // Additive adjustment, no renormalization: lowered back to zero,
        // the row-id tiebreak applies, and the filler's row 1 collides
        // with the first line's, so variant order decides between them.
        objects.change_z_index(first, -2).unwrap();
        objects.change_z_index(third, -1).unwrap();
        let order: Vec<ObjectId> = objects
            .list_for_frame(1)
            .unwrap()
            .into_iter()
            .map(|object| object.id)
            .collect();
        assert_eq!(order, vec![first, third, second]);
    }

    #[test]
    fn test_delete_cascades_points() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        let id = objects
            .create(Variant::Filler, 1, Point::new(0, 0), &defaults)
            .unwrap();
        objects.append_point(id, Point::new(1, 2)).unwrap();
        objects.append_point(id, Point::new(3, 4)).unwrap();
        objects.delete(id).unwrap();

        let orphans: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM filler_point", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(
            objects.delete(id),
            Err(CelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_properties_ignores_inapplicable_fields() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        let id = objects
            .create(Variant::Filler, 1, Point::new(0, 0), &defaults)
            .unwrap();
        let orange = Color::rgba(255, 128, 0, 255);
        objects
            .set_properties(id, "sun", Some(40), Some(Color::BLACK), Some(orange))
            .unwrap();
        let listed = objects.list_for_frame(1).unwrap();
        assert_eq!(listed[0].name, "sun");
        // Stroke fields do not exist on a filler; only the fill applied.
        assert_eq!(
            listed[0].shape,
            Shape::Filler {
                fill_color: orange,
                points: vec![],
            }
        );
    }

    #[test]
    fn test_filler_creation_uses_default_stroke_color() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        assert_eq!(defaults.fill_color, Color::TRANSPARENT);
        db.objects()
            .create(Variant::Filler, 1, Point::new(0, 0), &defaults)
            .unwrap();
        let listed = db.objects().list_for_frame(1).unwrap();
        // Opaque black, not the transparent default fill.
        assert_eq!(
            listed[0].shape,
            Shape::Filler {
                fill_color: defaults.color,
                points: vec![],
            }
        );
    }

    #[test]
    fn test_creation_uses_project_defaults() {
        let db = store_with_defaults();
        let defaults = db.settings().load().unwrap();
        let objects = db.objects();
        objects
            .create(Variant::Ellipse, 1, Point::new(4, 5), &defaults)
            .unwrap();
        let listed = objects.list_for_frame(1).unwrap();
        assert_eq!(listed[0].name, "Ellipse");
        assert_eq!(listed[0].z_index, 0);
        match &listed[0].shape {
            Shape::Ellipse {
                stroke_width,
                color,
                fill_color,
                ..
            } => {
                assert_eq!(*stroke_width, defaults.stroke_width);
                assert_eq!(*color, defaults.color);
                assert_eq!(*fill_color, defaults.fill_color);
            }
            other => panic!("expected ellipse, got {other:?}"),
        }
    }
}
