/// Classical top-down stable merge sort over `arr`, using `scratch` as
/// auxiliary storage of equal length. Comparator-based rather than
/// `Ord`-based so callers can sort [`crate::record::RecordSlice`] values by
/// the bytes they reference without making the slice type itself `Ord`.
pub(crate) fn merge_sort<T, F>(arr: &mut [T], scratch: &mut [T], less: &F)
where
    T: Copy,
    F: Fn(&T, &T) -> bool,
{
    debug_assert_eq!(arr.len(), scratch.len());
    let len = arr.len();
    if len < 2 {
        return;
    }
    merge_sort_range(arr, scratch, 0, len - 1, less);
}

fn merge_sort_range<T, F>(arr: &mut [T], scratch: &mut [T], first: usize, last: usize, less: &F)
where
    T: Copy,
    F: Fn(&T, &T) -> bool,
{
    if first >= last {
        return;
    }

    let mid = first + (last - first) / 2;
    merge_sort_range(arr, scratch, first, mid, less);
    merge_sort_range(arr, scratch, mid + 1, last, less);

    scratch[first..=last].copy_from_slice(&arr[first..=last]);

    let mut i = first;
    let mut k = mid + 1;
    let mut j = first;
    while i <= mid && k <= last {
        if less(&scratch[k], &scratch[i]) {
            arr[j] = scratch[k];
            k += 1;
        } else {
            arr[j] = scratch[i];
            i += 1;
        }
        j += 1;
    }
    while i <= mid {
        arr[j] = scratch[i];
        i += 1;
        j += 1;
    }
    while k <= last {
        arr[j] = scratch[k];
        k += 1;
        j += 1;
    }
}
