//! Undo/Redo command stack.
//!
//! Every user-visible change is pushed as a `Command` holding a forward
//! action, an inverse, and optionally a distinct redo path. Commands are
//! grouped: `undo` keeps popping until it reaches the previous group
//! boundary (`finish_group == true`), and `redo` replays up to the next one.
//!
//! A separate tentative stack holds preview actions. They never touch the
//! redo history until accepted, at which point they join the undo stack as
//! one group.
//!
//! The stack is generic over the context the actions mutate, so commands
//! borrow the canvas only while they run.

use std::collections::VecDeque;
use std::fmt;

/// A reversible action applied to a context `C`.
pub type Action<C> = Box<dyn FnMut(&mut C)>;

/// Hook the stack calls after every do/undo/redo pass.
pub trait UndoContext {
    fn after_action(&mut self, _name: &str) {}
}

/// What the stack is currently doing. Actions can read it through
/// `UndoStack::performing` to tell a live edit from a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Performing {
    #[default]
    Nothing,
    Do,
    Undo,
    Redo,
}

pub struct Command<C> {
    pub name: String,
    do_it: Action<C>,
    undo_it: Action<C>,
    redo_it: Option<Action<C>>,
    pub finish_group: bool,
}

impl<C> Command<C> {
    pub fn new(name: impl Into<String>, do_it: impl FnMut(&mut C) + 'static, undo_it: impl FnMut(&mut C) + 'static) -> Self {
        Self {
            name: name.into(),
            do_it: Box::new(do_it),
            undo_it: Box::new(undo_it),
            redo_it: None,
            finish_group: true,
        }
    }

    /// Use `redo_it` instead of the forward action when redoing.
    pub fn with_redo(mut self, redo_it: impl FnMut(&mut C) + 'static) -> Self {
        self.redo_it = Some(Box::new(redo_it));
        self
    }

    /// Keep the group open: the next command belongs to the same undo step.
    pub fn unfinished(mut self) -> Self {
        self.finish_group = false;
        self
    }

    /// Run the action for one direction. `is_do` selects forward vs inverse;
    /// `is_redo` picks the redo path when one was supplied.
    fn do_or_undo(&mut self, ctx: &mut C, is_do: bool, is_redo: bool) {
        match (is_do, is_redo, self.redo_it.as_mut()) {
            (false, _, _) => (self.undo_it)(ctx),
            (true, true, Some(redo)) => redo(ctx),
            (true, _, _) => (self.do_it)(ctx),
        }
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("finish_group", &self.finish_group)
            .field("has_redo", &self.redo_it.is_some())
            .finish()
    }
}

pub struct UndoStack<C> {
    /// Oldest first.
    undo_stack: VecDeque<Command<C>>,
    redo_stack: Vec<Command<C>>,
    tentative: Vec<Command<C>>,
    /// Maximum undo depth.
    max_depth: usize,
    performing: Performing,
    actions: u64,
}

impl<C: UndoContext> UndoStack<C> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            tentative: Vec::new(),
            max_depth: max_depth.max(1),
            performing: Performing::Nothing,
            actions: 0,
        }
    }

    pub fn performing(&self) -> Performing {
        self.performing
    }

    /// Number of completed do/undo/redo passes.
    pub fn action_count(&self) -> u64 {
        self.actions
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || !self.tentative.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn has_tentative(&self) -> bool {
        !self.tentative.is_empty()
    }

    /// Execute `command`, push it and clear the redo history. Pending
    /// tentative actions are accepted first and join the same group.
    pub fn do_action(&mut self, ctx: &mut C, mut command: Command<C>) {
        self.performing = Performing::Do;
        self.accept_tentative_action(false);
        log::debug!("do {:?}", command.name);
        command.do_or_undo(ctx, true, false);
        let name = command.name.clone();
        self.push_undo(command);
        self.redo_stack.clear();
        self.finish(ctx, &name);
    }

    /// Convenience form of `do_action`.
    pub fn undo_redo(
        &mut self,
        ctx: &mut C,
        name: impl Into<String>,
        do_it: impl FnMut(&mut C) + 'static,
        undo_it: impl FnMut(&mut C) + 'static,
        finish_group: bool,
    ) {
        let mut command = Command::new(name, do_it, undo_it);
        command.finish_group = finish_group;
        self.do_action(ctx, command);
    }

    /// `undo_redo` with a distinct redo path, for changes whose redo should
    /// not re-derive the new value from scratch.
    pub fn undo_redo_with(
        &mut self,
        ctx: &mut C,
        name: impl Into<String>,
        do_it: impl FnMut(&mut C) + 'static,
        undo_it: impl FnMut(&mut C) + 'static,
        finish_group: bool,
        redo_it: impl FnMut(&mut C) + 'static,
    ) {
        let mut command = Command::new(name, do_it, undo_it).with_redo(redo_it);
        command.finish_group = finish_group;
        self.do_action(ctx, command);
    }

    /// Set or clear the group boundary on the newest entry.
    pub fn finish_group(&mut self, finish: bool) {
        if let Some(top) = self.undo_stack.back_mut() {
            top.finish_group = finish;
        }
    }

    /// Undo back to the previous group boundary. Pending tentative actions
    /// are discarded first. Returns the name of the last command undone.
    pub fn undo(&mut self, ctx: &mut C) -> Option<String> {
        self.performing = Performing::Undo;
        self.undo_tentative_action(ctx);

        let mut last = None;
        while let Some(mut command) = self.undo_stack.pop_back() {
            log::debug!("undo {:?}", command.name);
            command.do_or_undo(ctx, false, false);
            last = Some(command.name.clone());
            self.redo_stack.push(command);
            if self.undo_stack.back().is_none_or(|c| c.finish_group) {
                break;
            }
        }
        match last {
            Some(name) => {
                self.finish(ctx, &name);
                Some(name)
            }
            None => {
                self.performing = Performing::Nothing;
                None
            }
        }
    }

    /// Re-apply forward to the next group boundary. Returns the name of the
    /// last command redone.
    pub fn redo(&mut self, ctx: &mut C) -> Option<String> {
        self.performing = Performing::Redo;

        let mut last = None;
        while let Some(mut command) = self.redo_stack.pop() {
            log::debug!("redo {:?}", command.name);
            command.do_or_undo(ctx, true, true);
            let finished = command.finish_group;
            last = Some(command.name.clone());
            self.push_undo(command);
            if finished {
                break;
            }
        }
        match last {
            Some(name) => {
                self.finish(ctx, &name);
                Some(name)
            }
            None => {
                self.performing = Performing::Nothing;
                None
            }
        }
    }

    // ─── Tentative actions ──────────────────────────────────────────────

    /// Execute a preview action. It is not part of the undo history and
    /// leaves the redo stack alone until accepted.
    pub fn do_tentatively(&mut self, ctx: &mut C, mut command: Command<C>) {
        self.performing = Performing::Do;
        command.finish_group = false;
        log::debug!("tentative {:?}", command.name);
        command.do_or_undo(ctx, true, false);
        self.tentative.push(command);
        self.performing = Performing::Nothing;
    }

    /// Move pending tentative actions onto the undo stack, oldest first.
    /// `finish` closes the group on the newest one. Returns whether
    /// anything was accepted.
    pub fn accept_tentative_action(&mut self, finish: bool) -> bool {
        if self.tentative.is_empty() {
            return false;
        }
        if let Some(last) = self.tentative.last_mut() {
            last.finish_group = finish;
        }
        self.redo_stack.clear();
        let accepted: Vec<Command<C>> = self.tentative.drain(..).collect();
        log::debug!("accept {} tentative action(s)", accepted.len());
        for command in accepted {
            self.push_undo(command);
        }
        true
    }

    /// Revert and drop every pending tentative action, newest first.
    pub fn undo_tentative_action(&mut self, ctx: &mut C) {
        while let Some(mut command) = self.tentative.pop() {
            log::debug!("revert tentative {:?}", command.name);
            command.do_or_undo(ctx, false, false);
        }
    }

    // ─── Housekeeping ───────────────────────────────────────────────────

    pub fn clear_stacks(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.tentative.clear();
    }

    /// One line per undo entry, newest first: the name followed by `F` for
    /// a group boundary or `-` for an open group.
    pub fn stack_info(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .rev()
            .map(|c| format!("{} {}", c.name, if c.finish_group { "F" } else { "-" }))
            .collect()
    }

    /// Push onto the undo history. Past the depth limit the oldest whole
    /// group is dropped; the group still being built is never split.
    fn push_undo(&mut self, command: Command<C>) {
        self.undo_stack.push_back(command);
        while self.undo_stack.len() > self.max_depth {
            let Some(boundary) = self.undo_stack.iter().position(|c| c.finish_group) else {
                break;
            };
            if boundary + 1 == self.undo_stack.len() {
                break;
            }
            self.undo_stack.drain(..=boundary);
        }
    }

    fn finish(&mut self, ctx: &mut C, name: &str) {
        self.actions += 1;
        ctx.after_action(name);
        self.performing = Performing::Nothing;
    }
}
