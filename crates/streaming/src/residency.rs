/// Lifecycle of a cached resource.
///
/// Entries start `Pending` and move to exactly one terminal state; they never
/// go back and are never evicted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Pending,
    Loaded,
    Failed,
}

impl ResourceState {
    pub fn is_settled(self) -> bool {
        !matches!(self, ResourceState::Pending)
    }
}
