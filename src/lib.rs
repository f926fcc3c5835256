/*!
# DOCX Filler Client

The client side of a document-generation web application, built in Rust.

## Overview

A user uploads a DOCX template, the server extracts its placeholder
variables, and the client synthesizes an editable form from the returned
schema. The user fills the form (or edits raw JSON directly), requests
generation and downloads the result. A library of saved templates and a
history of generated documents are managed through the same backend.

## Architecture

The crate is a library plus one interactive terminal binary:

### Core (no network, no terminal)
- **Schema Model** - in-memory representation of the variable schema
  returned for a parsed template (name, kind, nested fields, display order)
- **Form Synthesizer** - builds the editable input tree from a schema:
  text widgets for scalars, toggles for booleans, repeatable item groups
  for arrays
- **Form-to-Data Mapper** - the inverse direction: reconstructs the
  structured JSON payload from arbitrary form state, recovering structure
  from the deterministic widget-identifier convention
- **Mode Controller** - toggles between form editing and raw JSON editing
  without ever syncing one into the other, plus debounced JSON validation
- **Page Session** - single owner of all per-page state; every mutation is
  an explicit event dispatched into one reducer-style update function

### Edges
- **Remote Gateway** - thin `reqwest` wrapper over the backend endpoints
  (parse, generate, download, template library, history)
- **App** - the interactive command loop

## Error handling

Every failure is one of four kinds: network failure, server rejection
(surfaced verbatim), client-side validation failure, or an expired session
(HTTP 401), which turns into a login redirect target instead of an inline
message.

## Endpoints consumed

- `/parse-template` - extract the variable schema from an upload
- `/generate` - render a document from a template and JSON data
- `/download/{filename}` - fetch a generated file
- `/templates`, `/templates/{id}`, `/templates/save` - template library
- `/history`, `/history/{id}/...` - generated-document history
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod error;
pub mod form;
pub mod gateway;
pub mod mapper;
pub mod mode;
pub mod schema;
pub mod session;
pub mod validate;

/// Re-export everything from these modules to make it easier to use
pub use error::*;
pub use form::*;
pub use gateway::*;
pub use mapper::*;
pub use mode::*;
pub use schema::*;
pub use session::*;
pub use validate::*;
