// ============================================================================
// spark-observables - Either
// Payload of a combined stream: an event from the left or the right side
// ============================================================================

/// An event from one of two combined streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// The left payload, if any
    pub fn left(self) -> Option<L> {
        match self {
            Either::Left(value) => Some(value),
            Either::Right(_) => None,
        }
    }

    /// The right payload, if any
    pub fn right(self) -> Option<R> {
        match self {
            Either::Left(_) => None,
            Either::Right(value) => Some(value),
        }
    }

    pub fn as_ref(&self) -> Either<&L, &R> {
        match self {
            Either::Left(value) => Either::Left(value),
            Either::Right(value) => Either::Right(value),
        }
    }

    /// Collapse both sides into one value.
    pub fn either<T>(self, left: impl FnOnce(L) -> T, right: impl FnOnce(R) -> T) -> T {
        match self {
            Either::Left(value) => left(value),
            Either::Right(value) => right(value),
        }
    }
}

impl<L: Clone, R: Clone> Either<&L, &R> {
    pub fn cloned(self) -> Either<L, R> {
        match self {
            Either::Left(value) => Either::Left(value.clone()),
            Either::Right(value) => Either::Right(value.clone()),
        }
    }
}

impl<T> Either<T, T> {
    /// The payload, whichever side it came from
    pub fn into_inner(self) -> T {
        match self {
            Either::Left(value) | Either::Right(value) => value,
        }
    }
}
