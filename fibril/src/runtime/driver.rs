use crate::runtime::task::{Node, NodeId, State, Transition, Work};
use crate::utils::Arena;

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

/// Callback receiving every node transition.
pub(crate) type TransitionHook = Rc<dyn Fn(&Transition)>;

/// What the scheduler must do after one driver step.
///
/// Steps that call user code hand the node's work out of the tree, so the
/// tree is never borrowed while a body, a commit or a listener runs.
pub(crate) enum Step<E> {
    /// Run begin for the node, then put its work back.
    Begin(NodeId, Box<dyn Work<E>>),

    /// Deliver the outcome of a node that just committed, then notify the
    /// later siblings its rejection skipped.
    Commit(Box<dyn Work<E>>, Result<(), E>, Vec<Box<dyn Work<E>>>),

    /// Notify the work of nodes skipped by a cascade.
    Cancel(Vec<Box<dyn Work<E>>>),

    /// Keep walking.
    Continue,

    /// Nothing left to do until a completion fires.
    Idle,
}

/// The task forest together with the single walk cursor.
pub(crate) struct Tree<E> {
    nodes: Arena<Node<E>>,

    /// The node the walk is advancing; `None` while idle.
    current: Option<NodeId>,

    /// Nodes woken while the walk was busy elsewhere.
    ready: VecDeque<NodeId>,

    hook: Option<TransitionHook>,
}

impl<E: Clone> Tree<E> {
    pub(crate) fn new(capacity: usize, hook: Option<TransitionHook>) -> Self {
        Self {
            nodes: Arena::new(capacity),
            current: None,
            ready: VecDeque::new(),
            hook,
        }
    }

    pub(crate) fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub(crate) fn state(&self, id: NodeId) -> Option<State> {
        self.nodes.get(id.0).map(|node| node.state)
    }

    pub(crate) fn name(&self, id: NodeId) -> Option<Rc<str>> {
        self.nodes.get(id.0).map(|node| node.name.clone())
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Children of `id`, in creation order.
    pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.nodes.get(id.0).and_then(|node| node.first_child);

        while let Some(child) = next {
            out.push(child);
            next = self.nodes.get(child.0).and_then(|node| node.next_sibling);
        }

        out
    }

    /// Inserts a node under `frame` and returns it along with the node that
    /// has to be woken for the walk to reach it.
    ///
    /// A frame that is gone or already committed cannot take children; the
    /// node becomes a forest root instead.
    pub(crate) fn attach(
        &mut self,
        frame: Option<NodeId>,
        name: Rc<str>,
        work: Box<dyn Work<E>>,
    ) -> (NodeId, NodeId) {
        let parent = frame.filter(|frame| {
            self.nodes
                .get(frame.0)
                .is_some_and(|node| !node.state.is_terminal())
        });

        let id = NodeId(self.nodes.insert(Node::new(name, parent, work)));

        let Some(parent) = parent else {
            trace!(node = %id, "attached as root");
            return (id, id);
        };

        let last = self.nodes.get(parent.0).and_then(|node| node.last_child);

        match last {
            Some(last) => {
                if let Some(node) = self.nodes.get_mut(last.0) {
                    node.next_sibling = Some(id);
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(parent.0) {
                    node.first_child = Some(id);
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.last_child = Some(id);
        }

        trace!(node = %id, parent = %parent, "attached");
        (id, parent)
    }

    /// Moves a `Running` node to `Resolved` or `Rejected`.
    ///
    /// Returns `false` (and changes nothing) if the node already settled.
    pub(crate) fn settle(&mut self, id: NodeId, outcome: Result<(), E>) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };

        if node.state != State::Running {
            return false;
        }

        let to = match outcome {
            Ok(()) => State::Resolved,
            Err(error) => {
                node.error = Some(error);
                State::Rejected
            }
        };

        self.transition(id, to);
        true
    }

    /// Points the cursor at `id` if the walk is idle, or queues it.
    ///
    /// Returns `true` when the caller has to run the walk.
    pub(crate) fn wake(&mut self, id: NodeId) -> bool {
        if !self.is_resumable(id) {
            return false;
        }

        if self.current.is_some() {
            self.ready.push_back(id);
            return false;
        }

        debug!(node = %id, "waking driver");
        self.current = Some(id);
        true
    }

    /// Hands a node's work back after begin returned.
    ///
    /// A node abandoned while its begin ran is already committed; its work
    /// is returned so the caller can cancel it.
    pub(crate) fn restore(
        &mut self,
        id: NodeId,
        work: Box<dyn Work<E>>,
    ) -> Option<Box<dyn Work<E>>> {
        match self.nodes.get_mut(id.0) {
            Some(node) if node.state != State::Committed => {
                node.work = Some(work);
                None
            }
            _ => Some(work),
        }
    }

    /// Unlinks `id` from its parent so its subtree is walked as a forest
    /// root of its own.
    ///
    /// Returns the former parent, which the walk has to revisit now that
    /// it no longer waits on `id`.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let next = self.nodes.get(id.0).and_then(|node| node.next_sibling);

        let mut previous = None;
        let mut cursor = self.nodes.get(parent.0).and_then(|node| node.first_child);

        while let Some(child) = cursor {
            if child == id {
                break;
            }

            previous = Some(child);
            cursor = self.nodes.get(child.0).and_then(|node| node.next_sibling);
        }

        match previous {
            Some(previous) => {
                if let Some(node) = self.nodes.get_mut(previous.0) {
                    node.next_sibling = next;
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(parent.0) {
                    node.first_child = next;
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(parent.0) {
            if node.last_child == Some(id) {
                node.last_child = previous;
            }
        }

        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
            node.next_sibling = None;
        }

        debug!(node = %id, parent = %parent, "detached");
        Some(parent)
    }

    /// Force-commits a started node whose awaited input was cancelled.
    ///
    /// Only a `Running` node with no unfinished children qualifies. Returns
    /// its work (unless begin is still holding it) and the parent the walk
    /// has to revisit. A root is reclaimed on the spot.
    pub(crate) fn abandon(&mut self, id: NodeId) -> (Option<Box<dyn Work<E>>>, Option<NodeId>) {
        if self.state(id) != Some(State::Running) || self.first_pending_child(id).is_some() {
            return (None, None);
        }

        self.transition(id, State::Committed);

        let work = self.take_work(id);
        let parent = self.parent(id);

        debug!(node = %id, "abandoned");

        if parent.is_none() {
            self.reclaim(id);
        }

        (work, parent)
    }

    /// Advances the walk by one step.
    pub(crate) fn step(&mut self) -> Step<E> {
        let Some(id) = self.current else {
            return self.resume_next();
        };

        let Some(state) = self.state(id) else {
            self.current = None;
            return Step::Continue;
        };

        if state == State::Waiting {
            self.transition(id, State::Running);

            return match self.take_work(id) {
                Some(work) => Step::Begin(id, work),
                None => Step::Continue,
            };
        }

        if state == State::Rejected {
            let skipped = self.bail_out(self.children(id));

            if let Some(skipped) = skipped {
                return Step::Cancel(skipped);
            }
        }

        if let Some(child) = self.first_pending_child(id) {
            self.current = Some(child);
            return Step::Continue;
        }

        match state {
            State::Resolved => self.commit(id, Vec::new()),
            State::Rejected => {
                let skipped = self.bail_out(self.later_siblings(id)).unwrap_or_default();
                self.commit(id, skipped)
            }
            State::Committed => {
                let next = self
                    .nodes
                    .get(id.0)
                    .and_then(|node| node.next_sibling.or(node.parent));

                if next.is_none() {
                    self.reclaim(id);
                }

                self.current = next;
                Step::Continue
            }
            State::Running => {
                trace!(node = %id, "suspended");
                self.current = None;
                Step::Continue
            }
            State::Waiting => Step::Continue,
        }
    }

    /// Pops woken nodes until one can be resumed.
    fn resume_next(&mut self) -> Step<E> {
        while let Some(id) = self.ready.pop_front() {
            if self.is_resumable(id) {
                self.current = Some(id);
                return Step::Continue;
            }
        }

        Step::Idle
    }

    /// A node can take the cursor if it is live, not committed, and either
    /// started or a root. A waiting child is only ever reached by the walk,
    /// after its earlier siblings.
    fn is_resumable(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|node| match node.state {
            State::Committed => false,
            State::Waiting => node.parent.is_none(),
            _ => true,
        })
    }

    fn first_pending_child(&self, id: NodeId) -> Option<NodeId> {
        let mut next = self.nodes.get(id.0).and_then(|node| node.first_child);

        while let Some(child) = next {
            let node = self.nodes.get(child.0)?;

            if !node.state.is_terminal() {
                return Some(child);
            }

            next = node.next_sibling;
        }

        None
    }

    fn later_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.nodes.get(id.0).and_then(|node| node.next_sibling);

        while let Some(sibling) = next {
            out.push(sibling);
            next = self.nodes.get(sibling.0).and_then(|node| node.next_sibling);
        }

        out
    }

    /// Force-commits every not-yet-started node reachable from `start`.
    ///
    /// Started nodes are left alone (they still have to settle), but the
    /// worklist goes through them to reach their waiting descendants.
    /// Returns the skipped works, or `None` if nothing was skipped.
    fn bail_out(&mut self, start: Vec<NodeId>) -> Option<Vec<Box<dyn Work<E>>>> {
        let mut worklist = start;
        let mut skipped = 0usize;
        let mut works = Vec::new();

        while let Some(id) = worklist.pop() {
            let Some(state) = self.state(id) else {
                continue;
            };

            match state {
                State::Committed => continue,
                State::Waiting => {
                    self.transition(id, State::Committed);
                    skipped += 1;

                    if let Some(work) = self.take_work(id) {
                        works.push(work);
                    }
                }
                State::Running | State::Resolved | State::Rejected => {}
            }

            worklist.extend(self.children(id));
        }

        if skipped == 0 {
            return None;
        }

        debug!(skipped, "cascade bail-out");
        Some(works)
    }

    /// Commits a settled node whose subtree has fully committed.
    ///
    /// The rejection reaches the node's channel before the `skipped` works
    /// hear about their cancellation.
    fn commit(&mut self, id: NodeId, skipped: Vec<Box<dyn Work<E>>>) -> Step<E> {
        let outcome = match self.nodes.get_mut(id.0).and_then(|node| node.error.take()) {
            Some(error) => Err(error),
            None => Ok(()),
        };

        if let Err(error) = &outcome {
            self.deliver_to_parent(id, error);
        }

        self.transition(id, State::Committed);

        match self.take_work(id) {
            Some(work) => Step::Commit(work, outcome, skipped),
            None if skipped.is_empty() => Step::Continue,
            None => Step::Cancel(skipped),
        }
    }

    /// A rejected child becomes its parent's outcome, unless the parent
    /// already settled on its own.
    fn deliver_to_parent(&mut self, id: NodeId, error: &E) {
        let Some(parent) = self.parent(id) else {
            return;
        };

        if self.settle(parent, Err(error.clone())) {
            debug!(node = %id, parent = %parent, "rejection delivered to parent");
        }
    }

    /// Releases every slot of the tree rooted at `root`.
    fn reclaim(&mut self, root: NodeId) {
        let mut worklist = vec![root];
        let mut released = 0usize;

        while let Some(id) = worklist.pop() {
            worklist.extend(self.children(id));

            if self.nodes.remove(id.0).is_some() {
                released += 1;
            }
        }

        debug!(root = %root, released, "reclaimed tree");
    }

    fn take_work(&mut self, id: NodeId) -> Option<Box<dyn Work<E>>> {
        self.nodes.get_mut(id.0).and_then(|node| node.work.take())
    }

    fn transition(&mut self, id: NodeId, to: State) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };

        let from = node.state;
        node.state = to;

        trace!(node = %id, name = %node.name, %from, %to, "transition");

        if let Some(hook) = &self.hook {
            hook(&Transition {
                id,
                name: node.name.clone(),
                from,
                to,
            });
        }
    }
}
