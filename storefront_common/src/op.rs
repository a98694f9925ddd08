/// Implements the std arithmetic traits for a single-field newtype.
///
/// * `op!(binary T, Add, add)` implements `T + T`
/// * `op!(inplace T, AddAssign, add_assign)` implements `T += T`
/// * `op!(unary T, Neg, neg)` implements `-T`
#[macro_export]
macro_rules! op {
    (binary $t:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $fn(self, rhs: Self) -> Self::Output {
                Self::from(std::ops::$trait::$fn(self.value(), rhs.value()))
            }
        }
    };
    (inplace $t:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $t {
            fn $fn(&mut self, rhs: Self) {
                let mut v = self.value();
                std::ops::$trait::$fn(&mut v, rhs.value());
                *self = Self::from(v);
            }
        }
    };
    (unary $t:ty, $trait:ident, $fn:ident) => {
        impl std::ops::$trait for $t {
            type Output = Self;

            fn $fn(self) -> Self::Output {
                Self::from(std::ops::$trait::$fn(self.value()))
            }
        }
    };
}
