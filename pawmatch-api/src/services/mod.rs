pub mod access;
pub mod conversation;
pub mod discovery;
pub mod interactions;
pub mod pets;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;
