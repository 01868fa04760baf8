//! FILENAME: core/grid-session/tests/common/mod.rs
//! Shared fixtures for the session integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use grid_session::{ColumnDef, GridEvent, GridEventKind, GridOptions, GridSession, Record, RowId};

/// Six orders over two teams.
pub struct SalesFixture;

impl SalesFixture {
    pub fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::string("team"),
            ColumnDef::string("rep"),
            ColumnDef::number("amount"),
        ]
    }

    pub fn records() -> Vec<Record> {
        [
            (1, "Red", "Ana", 100.0),
            (2, "Blue", "Bo", 40.0),
            (3, "Red", "Cy", 60.0),
            (4, "Blue", "Di", 1500.0),
            (5, "Red", "Ed", 20.0),
            (6, "Blue", "Fa", 10.0),
        ]
        .iter()
        .map(|(id, team, rep, amount)| {
            Record::new()
                .with("id", *id as i64)
                .with("team", *team)
                .with("rep", *rep)
                .with("amount", *amount)
        })
        .collect()
    }

    /// A session with every group expanded and the fixture loaded.
    pub fn session() -> GridSession {
        let mut options = GridOptions::default();
        options.row_grouping.default_grouping_expansion_depth = -1;
        let mut session = GridSession::new(options);
        session.set_columns(Self::columns());
        session.set_rows(Self::records());
        session
    }
}

pub fn team(key: &str) -> RowId {
    RowId::text(format!("auto-generated-row-team/{}", key))
}

/// Records every event of `kind` published through the session.
pub struct EventLog {
    events: Arc<Mutex<Vec<GridEvent>>>,
}

impl EventLog {
    pub fn attach(session: &mut GridSession, kind: GridEventKind) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.subscribe(kind, move |event| sink.lock().unwrap().push(event.clone()));
        EventLog { events }
    }

    pub fn events(&self) -> Vec<GridEvent> {
        self.events.lock().unwrap().clone()
    }
}
