// Entity registry: lifecycle and ownership of all entity records

mod registry;

pub use registry::EntityRegistry;

#[cfg(test)]
mod tests;
