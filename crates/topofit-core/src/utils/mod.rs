/// Useful enumerations for charge and state filters and kinematic-fit modes.
pub mod enums;

/// Join a list of displayable items with `", "`, the way particle lists are printed in
/// diagnostics.
pub fn list_to_name<T: std::fmt::Display>(vec: &[T]) -> String {
    vec.iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Particle;

    #[test]
    fn test_list_to_name() {
        assert_eq!(list_to_name(&[Particle::PiPlus, Particle::PiMinus]), "Pi+, Pi-");
        assert_eq!(list_to_name::<Particle>(&[]), "");
    }
}
