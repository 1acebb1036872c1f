//! Prompt state machine for network device shells.
//!
//! A [`DeviceHandler`] classifies every line a device prints as output,
//! a paging marker, an error, a prompt of a known mode, or a prompt that needs
//! an automatic answer (enable password). It also knows which commands move
//! the shell between modes, so a command can be run in the mode it needs.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::error::ConnectError;

/// Mode transition: (from_state, command, to_state).
pub type Edge = (String, String, String);

/// Input answered automatically: (is_dynamic, value_or_param_key, record_in_output).
pub type InputSpec = (bool, String, bool);

pub struct DeviceHandler {
    /// Index of the current state in `all_states`
    current_state_index: usize,

    /// Built-in states first, then prompt states, then input states
    all_states: Vec<String>,

    all_regex: RegexSet,

    /// Maps regex match index to state index
    regex_index_map: HashMap<usize, usize>,

    /// Inclusive index range of prompt states in `all_states`
    prompt_index: (usize, usize),

    input_map: HashMap<String, InputSpec>,

    edges: Vec<Edge>,

    /// Error lines that should not fail a command
    ignore_errors: Option<RegexSet>,

    /// Values substituted for dynamic inputs, keyed by state name
    pub dyn_param: HashMap<String, String>,

    current_prompt: Option<String>,
}

/// States that exist in every handler, in index order.
const PRE_STATE: [&str; 3] = ["output", "more", "error"];

const MORE_STATE_INDEX: usize = 1;
const ERROR_STATE_INDEX: usize = 2;

impl DeviceHandler {
    /// Builds a handler from prompt, input and error patterns.
    ///
    /// State names are case-insensitive and stored lowercase. Prompt
    /// patterns get a prefix that tolerates the NUL and carriage return
    /// bytes some devices emit before a prompt.
    pub fn new<I, S>(
        prompt: Vec<(String, I)>,
        write: Vec<(String, InputSpec, I)>,
        more_regex: I,
        error_regex: I,
        edges: Vec<Edge>,
        ignore_errors: I,
        dyn_param: HashMap<String, String>,
    ) -> Result<DeviceHandler, ConnectError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let mut all_states: Vec<String> = PRE_STATE.iter().map(|s| s.to_string()).collect();

        let mut regexs: Vec<String> = Vec::new();
        let mut regex_index_map = HashMap::new();

        let start_offset = regexs.len();
        regexs.extend(more_regex.into_iter().map(|s| s.as_ref().to_string()));
        for i in start_offset..regexs.len() {
            regex_index_map.insert(i, MORE_STATE_INDEX);
        }

        let start_offset = regexs.len();
        regexs.extend(error_regex.into_iter().map(|s| s.as_ref().to_string()));
        for i in start_offset..regexs.len() {
            regex_index_map.insert(i, ERROR_STATE_INDEX);
        }

        let prompt_start = all_states.len();
        for (state, regex_iter) in prompt {
            let state_index = all_states.len();
            all_states.push(state.to_ascii_lowercase());

            let start_offset = regexs.len();
            regexs.extend(
                regex_iter
                    .into_iter()
                    .map(|s| format!(r"^\x00*\r{{0,1}}{}", s.as_ref().trim_start_matches('^'))),
            );
            for i in start_offset..regexs.len() {
                regex_index_map.insert(i, state_index);
            }
        }
        if all_states.len() == prompt_start {
            return Err(ConnectError::InvalidDeviceHandlerConfig(
                "at least one prompt state is required".to_string(),
            ));
        }
        let prompt_index = (prompt_start, all_states.len() - 1);

        let mut input_map = HashMap::new();
        for (state, input, regex_iter) in write {
            let state_index = all_states.len();
            let state = state.to_ascii_lowercase();
            all_states.push(state.clone());

            let start_offset = regexs.len();
            regexs.extend(regex_iter.into_iter().map(|s| s.as_ref().to_string()));
            for i in start_offset..regexs.len() {
                regex_index_map.insert(i, state_index);
            }
            input_map.insert(state, input);
        }

        // Paging markers are answered with a space.
        input_map.insert("more".to_string(), (false, " ".to_string(), false));

        let all_regex = RegexSet::new(&regexs).map_err(|err| {
            ConnectError::InvalidDeviceHandlerConfig(format!(
                "failed to build state regex set: {err}"
            ))
        })?;

        let mut ignore_iter = ignore_errors.into_iter().map(|s| s.as_ref().to_string()).peekable();
        let ignore_errors = if ignore_iter.peek().is_none() {
            None
        } else {
            Some(RegexSet::new(ignore_iter).map_err(|err| {
                ConnectError::InvalidDeviceHandlerConfig(format!(
                    "invalid ignore_errors regex set: {err}"
                ))
            })?)
        };

        let edges = edges
            .into_iter()
            .map(|(from, cmd, to)| (from.to_ascii_lowercase(), cmd, to.to_ascii_lowercase()))
            .collect();

        Ok(Self {
            current_state_index: 0,
            all_states,
            all_regex,
            regex_index_map,
            prompt_index,
            input_map,
            edges,
            ignore_errors,
            dyn_param,
            current_prompt: None,
        })
    }

    /// Maps a line to the first matching state, or `output` if nothing matches.
    fn line2state(&self, line: &str) -> (usize, &str) {
        let index = match self.all_regex.matches(line).into_iter().next() {
            Some(v) => v,
            None => return (0, PRE_STATE[0]),
        };
        let state_index = self.regex_index_map.get(&index).copied().unwrap_or(0);
        let state = self
            .all_states
            .get(state_index)
            .map(|s| s.as_str())
            .unwrap_or(PRE_STATE[0]);
        (state_index, state)
    }

    /// Feeds one line of device output into the state machine.
    pub fn read(&mut self, line: &str) {
        trace!("Read line: '{:?}'", line);
        let (state_index, state) = self.line2state(line);
        trace!("Converted to state: '{:?}'", state);
        if self.ignore_error(line) {
            trace!("Ignoring error state");
            self.current_state_index = 0;
            return;
        }
        if self.match_prompt(state_index) {
            self.current_prompt = Some(line.to_string());
        }
        self.current_state_index = state_index;
    }

    fn ignore_error(&self, line: &str) -> bool {
        self.ignore_errors
            .as_ref()
            .map(|set| set.is_match(line))
            .unwrap_or(false)
    }

    fn match_prompt(&self, index: usize) -> bool {
        let (start, end) = self.prompt_index;
        index >= start && index <= end
    }

    /// Returns true if `line` is a prompt of any known mode.
    pub fn read_prompt(&self, line: &str) -> bool {
        let (index, _) = self.line2state(line);
        self.match_prompt(index)
    }

    /// Returns the text to send if `line` asks for input.
    ///
    /// The flag tells whether the prompt text belongs in the command output.
    /// A dynamic input whose parameter is missing yields `None`.
    pub fn read_need_write(&self, line: &str) -> Option<(String, bool)> {
        let (_, state) = self.line2state(line);
        let (is_dyn, value, is_record) = self.input_map.get(state)?;
        if *is_dyn {
            return self.dyn_param.get(value).map(|v| (v.clone(), *is_record));
        }
        Some((value.clone(), *is_record))
    }

    pub fn current_state(&self) -> &str {
        self.all_states
            .get(self.current_state_index)
            .map(|s| s.as_str())
            .unwrap_or(PRE_STATE[0])
    }

    /// Returns the last prompt line matched by the state machine.
    pub fn current_prompt(&self) -> Option<&str> {
        self.current_prompt.as_deref()
    }

    pub fn error(&self) -> bool {
        self.current_state_index == ERROR_STATE_INDEX
    }

    /// Commands needed to move from the current mode to `state`.
    ///
    /// Breadth-first search over the edge list, so the shortest path wins.
    /// Each entry is (command, state expected after it).
    pub fn trans_state_write(&self, state: &str) -> Result<Vec<(String, String)>, ConnectError> {
        let start_node = self.current_state().to_string();
        let end_node = state.to_ascii_lowercase();

        if start_node == end_node {
            return Ok(Vec::new());
        }

        let mut adj_list: HashMap<&str, Vec<(&str, &str)>> = HashMap::new();
        for (from, cmd, to) in &self.edges {
            adj_list
                .entry(from.as_str())
                .or_default()
                .push((to.as_str(), cmd.as_str()));
        }

        let mut queue = VecDeque::new();
        queue.push_back(start_node.as_str());
        let mut visited = HashSet::new();
        visited.insert(start_node.as_str());

        // child -> (parent, command leading to child)
        let mut predecessors: HashMap<&str, (&str, &str)> = HashMap::new();

        while let Some(current_node) = queue.pop_front() {
            if current_node == end_node {
                break;
            }
            if let Some(neighbors) = adj_list.get(current_node) {
                for &(neighbor, cmd) in neighbors {
                    if visited.insert(neighbor) {
                        predecessors.insert(neighbor, (current_node, cmd));
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if !predecessors.contains_key(end_node.as_str()) {
            return Err(ConnectError::UnreachableState(end_node));
        }

        let mut path = Vec::new();
        let mut current = end_node.as_str();
        while current != start_node {
            let &(parent, cmd) = predecessors.get(current).ok_or_else(|| {
                ConnectError::InternalServerError(format!(
                    "failed to backtrack path from '{end_node}' to '{start_node}'"
                ))
            })?;
            path.push((cmd.to_string(), current.to_string()));
            current = parent;
        }
        path.reverse();
        trace!("Command path: '{:?}'", path);
        Ok(path)
    }
}

/// Carriage returns and backspaces that terminals put at the start of a line.
pub static IGNORE_START_LINE: Lazy<Regex> =
    Lazy::new(
        || match Regex::new(r"^(?:(\r+(\s+\r+)*)|(\u{8}+(\s+\u{8}+)*))") {
            Ok(re) => re,
            Err(err) => panic!("invalid IGNORE_START_LINE regex: {err}"),
        },
    );
