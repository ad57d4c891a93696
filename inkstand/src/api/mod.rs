//! API layer for HTTP request handling and data models.
//!
//! This module contains the JSON API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/auth/*`): Signup, login, logout, session probe
//! - **Profiles** (`/api/v1/profiles/*`): Profile reads and author onboarding
//! - **Frontend** (everything else): Embedded SPA assets with fallback
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! the rendered documentation is served at `/docs`.

pub mod handlers;
pub mod models;
