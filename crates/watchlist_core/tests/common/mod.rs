#![allow(dead_code)]

use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use watchlist_core::{
    CodeSource, InviteConfig, InviteService, ManualClock, NewUser, UserId, UserService,
};

pub const START_MS: i64 = 1_700_000_000_000;

pub fn add_user(conn: &Connection, display_name: &str) -> UserId {
    let email = format!("{}@example.com", display_name.to_lowercase().replace(' ', "."));
    UserService::new(conn, 100)
        .create_user(&NewUser {
            email,
            display_name: display_name.to_string(),
            ..NewUser::default()
        })
        .unwrap()
        .id
}

pub fn invite_service<'conn>(
    conn: &'conn Connection,
    clock: &Arc<ManualClock>,
) -> InviteService<'conn> {
    InviteService::new(conn, InviteConfig::default())
        .unwrap()
        .with_clock(clock.clone())
}

pub fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

pub fn invite_status(conn: &Connection, invite_id: i64) -> String {
    conn.query_row(
        "SELECT status FROM invites WHERE id = ?1;",
        [invite_id],
        |row| row.get(0),
    )
    .unwrap()
}

/// Hands out a fixed sequence of codes, then repeats the last one.
pub struct ScriptedCodes {
    codes: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedCodes {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|code| code.to_string()).collect()),
            last: Mutex::new(codes.last().map_or_else(String::new, |code| code.to_string())),
        }
    }
}

impl CodeSource for ScriptedCodes {
    fn generate(&self) -> String {
        match self.codes.lock().unwrap().pop_front() {
            Some(code) => code,
            None => self.last.lock().unwrap().clone(),
        }
    }

    fn is_well_formed(&self, code: &str) -> bool {
        !code.is_empty()
    }
}
