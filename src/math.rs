use std::ops::{Add, Mul, Sub};

pub fn sqr<T>(val: T) -> T
where
    T: Clone + Copy + Mul<T, Output = T>,
{
    val * val
}

/// t should be in the range [0..1]
pub fn lerp<T, S>(t: T, start: S, end: S) -> S
where
    S: Mul<T, Output = S>,
    S: Add<S, Output = S>,
    T: Sub<T, Output = T>,
    T: From<f32>,
    T: Copy,
{
    start * (Into::<T>::into(1f32) - t) + end * t
}

#[cfg(test)]
mod test_super {
    use glam::vec3;

    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        let a = vec3(1., 2., 3.);
        let b = vec3(-1., 0., 5.);
        assert_eq!(lerp(0f32, a, b), a);
        assert_eq!(lerp(1f32, a, b), b);
        assert_eq!(lerp(0.5f32, 2f32, 4f32), 3.);
    }
}
