//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{DatabasePool, UserRepository, EventRepository, RegistrationRepository};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub pool: DatabasePool,
    pub users: UserRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            pool,
        }
    }
}
