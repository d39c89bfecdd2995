//! Test-only helpers for constructing frames and scripting collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::frame::{Column, Dtype, Frame, Value};
use crate::io::collab::{CodeGenerator, CodeRequest};

/// Build a frame from columns, panicking on invalid shapes.
pub fn frame_of(columns: Vec<Column>) -> Frame {
    Frame::new(columns).expect("test frame should be valid")
}

/// Single int column frame.
pub fn int_frame(name: &str, values: Vec<i64>) -> Frame {
    frame_of(vec![Column::new(
        name,
        Dtype::Int,
        values.into_iter().map(Value::Int).collect(),
    )])
}

/// Code generator that replays a script of predetermined replies and records
/// every request it receives.
pub struct ScriptedGenerator {
    outputs: RefCell<VecDeque<Result<String>>>,
    requests: RefCell<Vec<CodeRequest>>,
}

impl ScriptedGenerator {
    pub fn new(outputs: Vec<Result<String>>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Script of successful replies.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
    }

    /// All requests seen so far, in order.
    pub fn requests(&self) -> Vec<CodeRequest> {
        self.requests.borrow().clone()
    }
}

impl CodeGenerator for ScriptedGenerator {
    fn generate(&self, request: &CodeRequest) -> Result<String> {
        self.requests.borrow_mut().push(request.clone());
        self.outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("scripted generator exhausted")))
    }
}
