//! Messages exchanged with the background solver.
//!
//! Requests and responses are JSON objects tagged with an upper-case
//! `type` and carrying a `payload`:
//!
//! ```json
//! {"type":"SOLVE","payload":{"rows":2,"cols":2,"numbers":[[null,1,null],...],"userMoves":[{"row":0,"col":0,"state":"forward"}]}}
//! ```
//!
//! Maps keyed by position travel as lists of `{row, col, ...}` entries,
//! since JSON object keys must be strings.

use crate::assist::AssistResult;
use crate::error::EngineError;
use crate::grid::{Cell, HintGrid, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input for one propagation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub rows: usize,
    pub cols: usize,
    /// Hint lattice, `(rows+1) x (cols+1)`
    #[serde(with = "nested_rows")]
    pub numbers: HintGrid,
    /// Cells placed by the player
    #[serde(with = "move_entries")]
    pub user_moves: BTreeMap<Position, Cell>,
}

impl SolveRequest {
    pub fn new(rows: usize, cols: usize, numbers: HintGrid, user_moves: BTreeMap<Position, Cell>) -> Self {
        Self {
            rows,
            cols,
            numbers,
            user_moves,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "UPPERCASE")]
pub enum WorkerRequest {
    Solve(SolveRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "UPPERCASE")]
pub enum WorkerResponse {
    Result(AssistResult),
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, EngineError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode<'a, T: Deserialize<'a>>(text: &'a str) -> Result<T, EngineError> {
    Ok(serde_json::from_str(text)?)
}

/// `Grid<Option<u8>>` as a list of rows.
pub(crate) mod nested_rows {
    use crate::grid::HintGrid;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(grid: &HintGrid, serializer: S) -> Result<S::Ok, S::Error> {
        let width = grid.cols().max(1);
        let rows: Vec<&[Option<u8>]> = grid.values().chunks(width).collect();
        rows.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HintGrid, D::Error> {
        let rows = Vec::<Vec<Option<u8>>>::deserialize(deserializer)?;
        HintGrid::from_rows(rows).ok_or_else(|| D::Error::custom("hint rows have different lengths"))
    }
}

/// `BTreeMap<Position, Cell>` as `[{row, col, state}]`.
pub(crate) mod move_entries {
    use crate::grid::{Cell, Position};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        row: usize,
        col: usize,
        state: Cell,
    }

    pub fn serialize<S: Serializer>(moves: &BTreeMap<Position, Cell>, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = moves
            .iter()
            .map(|(pos, &state)| Entry {
                row: pos.row,
                col: pos.col,
                state,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<Position, Cell>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (Position::new(e.row, e.col), e.state))
            .collect())
    }
}

/// `BTreeMap<Position, CellInfo>` as `[{row, col, state, source}]`.
pub(crate) mod info_entries {
    use crate::assist::{CellInfo, Source};
    use crate::grid::{Cell, Position};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        row: usize,
        col: usize,
        state: Cell,
        source: Source,
    }

    pub fn serialize<S: Serializer>(infos: &BTreeMap<Position, CellInfo>, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = infos
            .iter()
            .map(|(pos, info)| Entry {
                row: pos.row,
                col: pos.col,
                state: info.state,
                source: info.source,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Position, CellInfo>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| {
                (
                    Position::new(e.row, e.col),
                    CellInfo {
                        state: e.state,
                        source: e.source,
                    },
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::propagate;
    use crate::grid::Grid;

    fn request() -> SolveRequest {
        let mut numbers = Grid::filled(3, 3, None);
        numbers.set(Position::new(0, 1), Some(1));
        let mut moves = BTreeMap::new();
        moves.insert(Position::new(0, 0), Cell::Forward);
        SolveRequest::new(2, 2, numbers, moves)
    }

    #[test]
    fn test_request_wire_shape() {
        let json = encode(&WorkerRequest::Solve(request())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "SOLVE");
        assert_eq!(value["payload"]["rows"], 2);
        assert_eq!(value["payload"]["numbers"][0][1], 1);
        assert!(value["payload"]["numbers"][0][0].is_null());
        assert_eq!(value["payload"]["userMoves"][0]["state"], "forward");
        assert_eq!(value["payload"]["userMoves"][0]["col"], 0);
    }

    #[test]
    fn test_response_wire_shape() {
        let result = propagate(&request());
        let json = encode(&WorkerResponse::Result(result.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "RESULT");
        let states = value["payload"]["gridState"].as_array().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[1]["source"], "propagated");
        assert!(value["payload"]["cycleCells"].as_array().unwrap().is_empty());

        let back: WorkerResponse = decode(&json).unwrap();
        assert_eq!(back, WorkerResponse::Result(result));
    }

    #[test]
    fn test_decode_rejects_ragged_numbers() {
        let json = r#"{"type":"SOLVE","payload":{"rows":1,"cols":1,"numbers":[[null,null],[null]],"userMoves":[]}}"#;
        assert!(decode::<WorkerRequest>(json).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let json = r#"{"type":"PING","payload":{}}"#;
        assert!(matches!(decode::<WorkerRequest>(json), Err(EngineError::Protocol(_))));
    }
}
