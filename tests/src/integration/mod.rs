//! Cross-component scenarios.

pub mod fixtures;

#[cfg(test)]
mod coordination;
#[cfg(test)]
mod cross_context;
#[cfg(test)]
mod flows;
