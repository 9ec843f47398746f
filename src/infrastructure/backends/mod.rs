pub mod agent;
pub mod mock;

use crate::domain::models::BackendBox;
use crate::domain::models::BackendName;

pub struct BackendManager {}

impl BackendManager {
    pub fn get(name: BackendName) -> BackendBox {
        match name {
            BackendName::Agent => return Box::<agent::Agent>::default(),
            BackendName::Mock => return Box::<mock::MockAgent>::default(),
        }
    }
}
