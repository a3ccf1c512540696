//! Users, subjects and rooms: the lookups the scheduling core depends on.

use rusqlite::{Connection, OptionalExtension, Row};

use super::types::{NewRoom, Role, Room, User};

/// Suffixes given to the sub-rooms of a modular room ("Amphi A", "Amphi B", ...)
const SUB_ROOM_SUFFIXES: [&str; 10] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

pub fn insert_user(
    conn: &Connection,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: Role,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (email, first_name, last_name, role, created_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        (email, first_name, last_name, role),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, first_name, last_name, role FROM users WHERE id = ?",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                role: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Ids of every user holding `role`
pub fn user_ids_with_role(conn: &Connection, role: Role) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE role = ? ORDER BY id")?;
    let ids = stmt.query_map([role], |row| row.get(0))?;
    ids.collect()
}

pub fn count_users_with_role(conn: &Connection, role: Role) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users WHERE role = ?", [role], |row| {
        row.get(0)
    })
}

pub fn insert_subject(conn: &Connection, name: &str, code: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO subjects (name, code, created_at) VALUES (?1, ?2, datetime('now'))",
        (name, code),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn subject_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM subjects WHERE id = ?", [id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

pub fn insert_room(conn: &Connection, room: &NewRoom) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO rooms (name, building, floor, is_modular, parent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
        (
            &room.name,
            &room.building,
            &room.floor,
            room.is_modular,
            room.parent_id,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Creates a modular room and `sub_rooms` children named after it.
///
/// Sub-rooms inherit the parent's building and floor. At most ten sub-rooms
/// are created. Returns the parent id and the children ids in creation order.
pub fn insert_modular_room(
    conn: &Connection,
    room: &NewRoom,
    sub_rooms: usize,
) -> rusqlite::Result<(i64, Vec<i64>)> {
    let parent_id = insert_room(
        conn,
        &NewRoom {
            is_modular: true,
            parent_id: None,
            ..room.clone()
        },
    )?;

    let mut children = Vec::with_capacity(sub_rooms.min(SUB_ROOM_SUFFIXES.len()));
    for suffix in SUB_ROOM_SUFFIXES.iter().take(sub_rooms) {
        let child = NewRoom {
            name: format!("{} {}", room.name, suffix),
            building: room.building.clone(),
            floor: room.floor.clone(),
            is_modular: false,
            parent_id: Some(parent_id),
        };
        children.push(insert_room(conn, &child)?);
    }

    Ok((parent_id, children))
}

const ROOM_COLUMNS: &str = "id, name, building, floor, is_modular, parent_id";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        building: row.get(2)?,
        floor: row.get(3)?,
        is_modular: row.get(4)?,
        parent_id: row.get(5)?,
    })
}

pub fn find_room(conn: &Connection, id: i64) -> rusqlite::Result<Option<Room>> {
    conn.query_row(
        &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?"),
        [id],
        room_from_row,
    )
    .optional()
}

/// Sub-rooms whose `parent_id` is `parent_id`
pub fn child_rooms(conn: &Connection, parent_id: i64) -> rusqlite::Result<Vec<Room>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROOM_COLUMNS} FROM rooms WHERE parent_id = ? ORDER BY id"
    ))?;
    let rooms = stmt.query_map([parent_id], room_from_row)?;
    rooms.collect()
}
