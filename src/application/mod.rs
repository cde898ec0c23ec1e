/// Application layer - Use cases, probers and DTOs
///
/// This layer contains the application logic that orchestrates
/// domain services and coordinates with infrastructure through ports.
pub mod dto;
pub mod probers;
pub mod use_cases;
