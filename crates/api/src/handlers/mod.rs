pub mod rain_lock;
pub mod schedules;
pub mod status;
pub mod zones;
