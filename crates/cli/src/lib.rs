//! Command line interface for the alembic JavaScript deobfuscator.

pub mod commands;
