/// Transaction context handed to every executor.
///
/// Concurrency control is outside this engine's scope; the transaction
/// currently only carries an id so executor signatures already take the
/// collaborator they will need.
#[derive(Debug)]
pub struct Transaction {
    id: u64,
}

impl Transaction {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}
