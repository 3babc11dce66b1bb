pub mod env_adapter;
