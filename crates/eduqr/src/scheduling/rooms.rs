//! Room hierarchy resolution.

use rusqlite::Connection;
use tracing::warn;

use crate::db::{catalog, Room};
use crate::error::{Entity, SchedulingError};

/// Returns the rooms whose bookings contend with a booking of `room_id`.
///
/// The group is the room itself, plus its sub-rooms when it is a modular
/// parent, or plus its parent when it is a sub-room. Only one level is ever
/// traversed, in one direction.
pub fn contention_group(conn: &Connection, room_id: i64) -> Result<Vec<Room>, SchedulingError> {
    let room = catalog::find_room(conn, room_id)?.ok_or(SchedulingError::NotFound {
        entity: Entity::Room,
        id: room_id,
    })?;

    let related = if room.is_modular {
        catalog::child_rooms(conn, room.id)?
    } else if let Some(parent_id) = room.parent_id {
        match catalog::find_room(conn, parent_id)? {
            Some(parent) => vec![parent],
            None => {
                warn!(room_id, parent_id, "Sub-room points at a missing parent room");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let mut group = Vec::with_capacity(related.len() + 1);
    group.push(room);
    group.extend(related);
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::campus;
    use crate::db::ScheduleDb;

    fn ids(group: &[Room]) -> Vec<i64> {
        group.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_standalone_room_contends_only_with_itself() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        let group = db.read(|conn| contention_group(conn, c.standalone)).unwrap();
        assert_eq!(ids(&group), vec![c.standalone]);
    }

    #[test]
    fn test_modular_parent_includes_children() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        let group = db.read(|conn| contention_group(conn, c.hall)).unwrap();
        assert_eq!(ids(&group), vec![c.hall, c.hall_a, c.hall_b]);
    }

    #[test]
    fn test_sub_room_includes_parent_but_not_siblings() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let c = campus(&db);
        let group = db.read(|conn| contention_group(conn, c.hall_a)).unwrap();
        assert_eq!(ids(&group), vec![c.hall_a, c.hall]);
    }

    #[test]
    fn test_missing_room_is_not_found() {
        let db = ScheduleDb::open_in_memory().unwrap();
        let err = db.read(|conn| contention_group(conn, 404)).unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::NotFound {
                entity: Entity::Room,
                id: 404
            }
        ));
    }
}
