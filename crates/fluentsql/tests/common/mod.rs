//! In-memory recording pool shared by the integration tests.

#![allow(dead_code)]

use fluentsql::{
    Connection, ConnectionPool, Dialect, DriverError, QueryOutput, Router, RoutingGroup, Row,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    statements: Vec<String>,
    replies: VecDeque<Result<QueryOutput, DriverError>>,
    groups: Vec<RoutingGroup>,
    acquired: usize,
    released: usize,
    refuse_connections: bool,
}

/// Records every statement and hands out scripted replies in order.
///
/// Statements without a scripted reply complete with zero affected rows.
#[derive(Clone, Default)]
pub struct MockPool {
    dialect: Dialect,
    state: Arc<Mutex<State>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn router(&self, group: RoutingGroup) -> Router<MockPool> {
        Router::new(Arc::new(self.clone()), group)
    }

    pub fn reply(&self, output: QueryOutput) -> &Self {
        self.state.lock().unwrap().replies.push_back(Ok(output));
        self
    }

    pub fn reply_rows(&self, rows: Vec<Row>) -> &Self {
        self.reply(QueryOutput::Rows(rows))
    }

    pub fn reply_done(&self, affected_rows: u64, insert_id: Option<u64>) -> &Self {
        self.reply(QueryOutput::Done {
            affected_rows,
            insert_id,
        })
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(Err(DriverError::new(message)));
        self
    }

    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connections = true;
    }

    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn groups(&self) -> Vec<RoutingGroup> {
        self.state.lock().unwrap().groups.clone()
    }

    pub fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }

    pub fn released(&self) -> usize {
        self.state.lock().unwrap().released
    }
}

pub struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl Connection for MockConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(sql.to_string());
        state.replies.pop_front().unwrap_or(Ok(QueryOutput::Done {
            affected_rows: 0,
            insert_id: None,
        }))
    }

    fn release(self) {
        self.state.lock().unwrap().released += 1;
    }
}

impl ConnectionPool for MockPool {
    type Connection = MockConnection;

    async fn get_connection(&self, group: RoutingGroup) -> Result<MockConnection, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.groups.push(group);
        if state.refuse_connections {
            return Err(DriverError::new("pool exhausted"));
        }
        state.acquired += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

pub fn user_row(id: i64, name: &str) -> Row {
    Row::from_pairs([("id", fluentsql::Value::Int(id)), ("name", name.into())])
}
