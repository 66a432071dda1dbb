/// Options for update operations.
///
/// With `just_once` only the first matching document is updated.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateOptions {
    just_once: bool,
}

impl UpdateOptions {
    pub fn new(just_once: bool) -> Self {
        Self { just_once }
    }

    pub fn is_just_once(&self) -> bool {
        self.just_once
    }
}

pub fn just_once() -> UpdateOptions {
    UpdateOptions::new(true)
}
